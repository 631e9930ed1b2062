//! HTTP client for a Cohere-compatible embedding and rerank API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::{EmbeddingProvider, InputPurpose, RankedItem, RerankProvider};

/// Client for the `/v2/embed` and `/v2/rerank` endpoints.
///
/// One client serves both provider roles; the search pipeline and the
/// indexer share it behind their respective trait objects.
pub struct CohereClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl CohereClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ProviderError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(self.config.api_key.trim())
            .json(body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Api {
                endpoint,
                status,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::Decode { endpoint, source })
    }

    /// Cheap credential check: lists models and reports the HTTP outcome.
    pub async fn validate_key(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/v1/models"))
            .bearer_auth(self.config.api_key.trim())
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: "models",
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Api {
                endpoint: "models",
                status,
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for CohereClient {
    async fn embed(&self, texts: &[String], purpose: InputPurpose) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = texts.len(), purpose = purpose.as_str(), "embedding texts");
        let body = EmbedRequest {
            model: &self.config.embed_model,
            texts,
            input_type: purpose.as_str(),
            embedding_types: &["float"],
            output_dimension: self.config.embed_dim,
        };
        let response: EmbedResponse = self.post_json("embed", "/v2/embed", &body).await?;

        let vectors = response
            .embeddings
            .and_then(|e| e.float)
            .unwrap_or_default();
        if vectors.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.embed_dim
    }

    fn provider_name(&self) -> &str {
        "cohere"
    }
}

#[async_trait]
impl RerankProvider for CohereClient {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = documents.len(), top_n, "reranking candidates");
        let body = RerankRequest {
            model: &self.config.rerank_model,
            query,
            documents,
            top_n,
        };
        let response: RerankResponse = self.post_json("rerank", "/v2/rerank", &body).await?;
        Ok(response.results)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
    embedding_types: &'a [&'a str],
    output_dimension: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Option<EmbedVectors>,
}

#[derive(Deserialize)]
struct EmbedVectors {
    #[serde(default)]
    float: Option<Vec<Vec<f32>>>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RankedItem>,
}
