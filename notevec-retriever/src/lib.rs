//! notevec-retriever: semantic indexing and search over a notes directory.
//!
//! This crate wires the workspace together: it walks a directory of Markdown
//! notes, chunks them with `notevec-context`, embeds chunks through a
//! `notevec-embed` provider, persists everything in SQLite, and answers
//! queries with vector search plus a rerank pass.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: the SQLite store for documents, chunks, and embeddings
//! - **[`indexing`]**: incremental reconcile, the embedding batcher, and the
//!   debounced file watcher
//! - **[`search`]**: the query → vector search → rerank pipeline
//! - **[`config`]**: TOML configuration under the XDG directories
//!
//! ## Data Flow
//!
//! ```text
//! Watcher/CLI → Indexer → Chunker → NoteIndex (chunks)
//!                                       ↓
//!                         Embedding batcher → NoteIndex (vectors)
//!
//! query → Searcher → NoteIndex::search_similar → rerank → ranked results
//! ```

pub mod config;
pub mod indexing;
pub mod search;
pub mod storage;
