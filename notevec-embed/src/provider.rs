//! Provider traits consumed by the indexing and search pipelines.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// What the text being embedded will be used for.
///
/// Retrieval models embed stored passages and incoming queries differently;
/// the purpose is forwarded to the provider on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    /// Text that will be stored and searched against.
    Document,
    /// A query that will be matched against stored documents.
    Query,
}

impl InputPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            InputPurpose::Document => "search_document",
            InputPurpose::Query => "search_query",
        }
    }
}

/// One reranked selection: an index into the submitted candidate list plus
/// the provider's relevance score.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedItem {
    pub index: usize,
    pub relevance_score: f64,
}

/// Turns text into fixed-width vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String], purpose: InputPurpose) -> Result<Vec<Vec<f32>>>;

    /// Width of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Name used in logs and diagnostics.
    fn provider_name(&self) -> &str;
}

/// Scores a small candidate set against a query, most relevant first.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Rank `documents` by relevance to `query`, returning at most `top_n`
    /// selections. Each selection's `index` refers to the submitted list.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>>;
}
