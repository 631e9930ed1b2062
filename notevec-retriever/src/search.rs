//! Query pipeline: embed the query, gather vector-search candidates, rerank.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use notevec_embed::{EmbeddingProvider, InputPurpose, RerankProvider};

use crate::storage::NoteIndex;

/// Candidates pulled from vector search before reranking.
pub const VECTOR_SEARCH_LIMIT: usize = 20;
/// Results requested from the rerank provider.
pub const RERANK_TOP_N: usize = 10;

/// One ranked search result.
///
/// `score` is the rerank provider's relevance score; the vector-search
/// distance only selects candidates and never surfaces here.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub rank: usize,
    pub score: f64,
    pub path: String,
    pub heading: String,
    pub content: String,
    pub start_line: i64,
    pub end_line: i64,
    pub doc_id: i64,
    pub chunk_id: i64,
}

/// Two-stage retrieval over a [`NoteIndex`].
pub struct Searcher {
    store: NoteIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<dyn RerankProvider>,
}

impl Searcher {
    pub fn new(
        store: NoteIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<dyn RerankProvider>,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
        }
    }

    /// Run the full pipeline for one query.
    ///
    /// An empty candidate set yields an empty result list without touching
    /// the rerank provider; every other failure aborts the search.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let vectors = self
            .embedder
            .embed(&[query.to_string()], InputPurpose::Query)
            .await
            .context("failed to embed query")?;
        let query_vector = vectors
            .into_iter()
            .next()
            .context("embedding provider returned no query vector")?;

        let candidates = self
            .store
            .search_similar(&query_vector, VECTOR_SEARCH_LIMIT)
            .await
            .context("vector search failed")?;
        if candidates.is_empty() {
            debug!("no vector-search candidates, skipping rerank");
            return Ok(Vec::new());
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let ranked = self
            .reranker
            .rerank(query, &documents, RERANK_TOP_N)
            .await
            .context("rerank failed")?;

        let mut results = Vec::with_capacity(ranked.len());
        for (position, item) in ranked.iter().enumerate() {
            let candidate = candidates.get(item.index).with_context(|| {
                format!(
                    "rerank returned index {} outside the {} submitted candidates",
                    item.index,
                    candidates.len()
                )
            })?;
            results.push(SearchResult {
                rank: position + 1,
                score: item.relevance_score,
                path: candidate.path.clone(),
                heading: candidate.heading.clone(),
                content: candidate.content.clone(),
                start_line: candidate.start_line,
                end_line: candidate.end_line,
                doc_id: candidate.doc_id,
                chunk_id: candidate.chunk_id,
            });
        }

        Ok(results)
    }
}
