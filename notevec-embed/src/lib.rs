//! notevec-embed: embedding and rerank providers for notevec.
//!
//! This crate defines the two provider interfaces the indexing and search
//! pipelines depend on — [`EmbeddingProvider`] and [`RerankProvider`] — plus
//! the production implementation, [`CohereClient`], a thin HTTP client for a
//! Cohere-compatible API. Callers hold providers as trait objects so tests
//! can substitute deterministic fakes without touching the network.

pub mod cohere;
pub mod config;
pub mod error;
pub mod provider;

pub use cohere::CohereClient;
pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use provider::{EmbeddingProvider, InputPurpose, RankedItem, RerankProvider};
