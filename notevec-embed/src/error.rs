//! Error types for the provider layer.

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failures surfaced by the embedding and rerank providers.
///
/// Transport and authentication problems map onto [`Transport`] and [`Api`];
/// a structurally valid response that carries no vectors is its own variant,
/// [`EmptyResponse`], because callers treat it differently from a dead
/// connection (the index stays consistent, the chunks are merely not yet
/// searchable).
///
/// [`Transport`]: ProviderError::Transport
/// [`Api`]: ProviderError::Api
/// [`EmptyResponse`]: ProviderError::EmptyResponse
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request never completed (connect, TLS, timeout, ...).
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{endpoint} returned {status}: {message}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        message: String,
    },

    /// The provider answered but returned no embedding vectors.
    #[error("provider returned no embeddings")]
    EmptyResponse,

    /// The response body did not match the expected shape.
    #[error("malformed {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}
