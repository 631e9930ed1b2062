//! Configuration for the HTTP provider client.

use std::time::Duration;

pub const DEFAULT_EMBED_MODEL: &str = "embed-v4.0";
pub const DEFAULT_RERANK_MODEL: &str = "rerank-v3.5";
pub const DEFAULT_EMBED_DIM: usize = 1024;
pub const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for a [`CohereClient`](crate::CohereClient).
///
/// The base URL is configurable so tests can point the client at a local
/// mock server; everything else defaults to the production models.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub embed_model: String,
    pub rerank_model: String,
    pub embed_dim: usize,
    pub base_url: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            rerank_model: DEFAULT_RERANK_MODEL.to_string(),
            embed_dim: DEFAULT_EMBED_DIM,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    pub fn with_rerank_model(mut self, model: impl Into<String>) -> Self {
        self.rerank_model = model.into();
        self
    }

    pub fn with_embed_dim(mut self, dim: usize) -> Self {
        self.embed_dim = dim;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_production_models() {
        let config = ProviderConfig::new("key");
        assert_eq!(config.embed_model, "embed-v4.0");
        assert_eq!(config.rerank_model, "rerank-v3.5");
        assert_eq!(config.embed_dim, 1024);
        assert_eq!(config.base_url, "https://api.cohere.com");
    }

    #[test]
    fn builder_methods_override() {
        let config = ProviderConfig::new("key")
            .with_embed_dim(256)
            .with_base_url("http://localhost:9999");
        assert_eq!(config.embed_dim, 256);
        assert_eq!(config.base_url, "http://localhost:9999");
    }
}
