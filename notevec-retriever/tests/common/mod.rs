//! Deterministic provider fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use notevec_embed::{
    EmbeddingProvider, InputPurpose, ProviderError, RankedItem, RerankProvider,
    Result as ProviderResult,
};

/// Embedder that derives a stable pseudo-vector from the text bytes and
/// counts how many embed calls were made.
pub struct HashEmbedder {
    dim: usize,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _purpose: InputPurpose,
    ) -> ProviderResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let seed = text
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
                (0..self.dim)
                    .map(|i| (((seed >> (i % 48)) & 0xff) as f32) / 255.0)
                    .collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn provider_name(&self) -> &str {
        "hash-mock"
    }
}

/// Embedder that returns the same fixed vector for every text.
pub struct StaticEmbedder {
    pub vector: Vec<f32>,
}

impl StaticEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self { vector }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(
        &self,
        texts: &[String],
        _purpose: InputPurpose,
    ) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn provider_name(&self) -> &str {
        "static-mock"
    }
}

/// Reranker that replays a scripted response and counts calls.
pub struct ScriptedReranker {
    pub response: Vec<RankedItem>,
    pub calls: AtomicUsize,
}

impl ScriptedReranker {
    pub fn new(response: Vec<RankedItem>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RerankProvider for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_n: usize,
    ) -> ProviderResult<Vec<RankedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Reranker that fails every call.
pub struct FailingReranker;

#[async_trait]
impl RerankProvider for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
        _top_n: usize,
    ) -> ProviderResult<Vec<RankedItem>> {
        Err(ProviderError::EmptyResponse)
    }
}
