//! notevec-context: heading-aware chunking for Markdown notes.
//!
//! This crate turns raw note text into the bounded passages the rest of the
//! notevec workspace embeds and searches. Chunks follow heading structure
//! (each chunk carries the breadcrumb of headings active where it starts) and
//! are capped at a size budget so a single long section becomes several
//! passages instead of one oversized one.
//!
//! The crate is deliberately a leaf: no I/O, no async, just text in and
//! [`Chunk`]s out. See [`chunk_markdown`] for the algorithm and
//! [`extract_title`] for the companion title heuristic.

pub mod markdown;

pub use markdown::{Chunk, chunk_markdown, extract_title};
