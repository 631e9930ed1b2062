//! Incremental indexing: reconcile a notes directory against the store and
//! embed whatever changed.
//!
//! A reconcile pass enumerates note files, removes documents whose files are
//! gone, reindexes files that are new or whose mtime moved past the recorded
//! one, and hands the accumulated chunk texts to the embedding batcher in
//! one call. Unchanged files are skipped entirely — no read, no chunking,
//! no provider call. Any per-file error aborts the whole pass.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use ignore::WalkBuilder;
use tracing::debug;

use notevec_context::{chunk_markdown, extract_title};
use notevec_embed::{EmbeddingProvider, InputPurpose};

use crate::storage::{Document, NoteIndex};

/// Chunks per embedding request.
pub const EMBED_BATCH_SIZE: usize = 96;

/// A chunk that has been persisted but not yet embedded.
#[derive(Debug, Clone)]
pub struct PendingEmbedding {
    pub chunk_id: i64,
    pub text: String,
}

/// Side-channel progress report. Purely informational.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub path: Option<String>,
    pub message: String,
}

impl Progress {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

pub type ProgressFn = dyn Fn(Progress) + Send + Sync;

fn report(progress: Option<&ProgressFn>, update: Progress) {
    if let Some(callback) = progress {
        callback(update);
    }
}

/// Drives chunking, storage, and the embedding batcher for one notes tree.
pub struct Indexer {
    store: NoteIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    root: PathBuf,
}

impl Indexer {
    pub fn new(store: NoteIndex, embedder: Arc<dyn EmbeddingProvider>, root: PathBuf) -> Self {
        Self {
            store,
            embedder,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &NoteIndex {
        &self.store
    }

    /// Reconcile the tree and embed the resulting pending chunks.
    pub async fn index(&self, full_reindex: bool, progress: Option<&ProgressFn>) -> Result<()> {
        let pending = self.reconcile(full_reindex, progress).await?;
        self.embed_pending(&pending, progress).await
    }

    /// Reconcile the tree against the store, returning the chunks that still
    /// need embeddings. Deletions are applied immediately; file contents are
    /// only read for files that need reindexing.
    pub async fn reconcile(
        &self,
        full_reindex: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<PendingEmbedding>> {
        let files = self.collect_note_files()?;
        let existing = self
            .store
            .get_all_documents()
            .await
            .context("failed to load indexed documents")?;
        let existing_by_path: HashMap<&str, &Document> =
            existing.iter().map(|doc| (doc.path.as_str(), doc)).collect();
        let current_paths: HashSet<&str> = files.iter().map(String::as_str).collect();

        for doc in &existing {
            if !current_paths.contains(doc.path.as_str()) {
                report(
                    progress,
                    Progress::message(format!("removing deleted: {}", doc.path)),
                );
                self.store
                    .delete_document(&doc.path)
                    .await
                    .with_context(|| format!("failed to delete document {}", doc.path))?;
            }
        }

        let mut to_index = Vec::new();
        for (i, rel) in files.iter().enumerate() {
            report(
                progress,
                Progress {
                    current: i + 1,
                    total: files.len(),
                    path: Some(rel.clone()),
                    message: "checking files".to_string(),
                },
            );
            if self
                .needs_reindex(rel, full_reindex, existing_by_path.get(rel.as_str()).copied())
                .await?
            {
                to_index.push(rel.clone());
            }
        }

        if to_index.is_empty() {
            report(progress, Progress::message("index is up to date"));
            return Ok(Vec::new());
        }

        let mut pending = Vec::new();
        let total = to_index.len();
        for (i, rel) in to_index.iter().enumerate() {
            report(
                progress,
                Progress {
                    current: i + 1,
                    total,
                    path: Some(rel.clone()),
                    message: format!("parsing {rel}"),
                },
            );
            pending.extend(self.parse_note(rel).await?);
        }

        if pending.is_empty() {
            report(progress, Progress::message("no chunks to embed"));
        }
        Ok(pending)
    }

    /// Reindex one note and embed its chunks. Used by the watcher.
    pub async fn reindex_file(&self, rel: &str) -> Result<()> {
        let pending = self.parse_note(rel).await?;
        self.embed_pending(&pending, None).await
    }

    /// Embed pending chunks in fixed-size batches, one provider call at a
    /// time. A failing batch aborts the call; earlier batches stay committed.
    pub async fn embed_pending(
        &self,
        pending: &[PendingEmbedding],
        progress: Option<&ProgressFn>,
    ) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let total_batches = pending.len().div_ceil(EMBED_BATCH_SIZE);
        for (batch_idx, batch) in pending.chunks(EMBED_BATCH_SIZE).enumerate() {
            let batch_no = batch_idx + 1;
            report(
                progress,
                Progress {
                    current: batch_no,
                    total: total_batches,
                    path: None,
                    message: format!(
                        "embedding batch {batch_no}/{total_batches} ({} chunks)",
                        batch.len()
                    ),
                },
            );

            let texts: Vec<String> = batch.iter().map(|unit| unit.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts, InputPurpose::Document)
                .await
                .with_context(|| format!("failed to generate embeddings for batch {batch_no}"))?;
            if vectors.len() != batch.len() {
                bail!(
                    "embedding provider returned {} vectors for a batch of {} (batch {batch_no})",
                    vectors.len(),
                    batch.len()
                );
            }

            for (unit, vector) in batch.iter().zip(&vectors) {
                self.store
                    .insert_embedding(unit.chunk_id, vector)
                    .await
                    .with_context(|| {
                        format!(
                            "failed to store embedding for chunk {} (batch {batch_no})",
                            unit.chunk_id
                        )
                    })?;
            }
        }

        Ok(())
    }

    /// Parse one note: upsert its document, replace its chunks, and return
    /// the chunks awaiting embeddings.
    async fn parse_note(&self, rel: &str) -> Result<Vec<PendingEmbedding>> {
        let abs = self.root.join(rel);
        let metadata = tokio::fs::metadata(&abs)
            .await
            .with_context(|| format!("failed to stat {rel}"))?;
        let modified_at = epoch_seconds(
            metadata
                .modified()
                .with_context(|| format!("no modification time for {rel}"))?,
        )?;
        let content = tokio::fs::read_to_string(&abs)
            .await
            .with_context(|| format!("failed to read {rel}"))?;

        let title = extract_title(&content, rel);
        let doc_id = self
            .store
            .upsert_document(rel, &title, modified_at, Utc::now().timestamp())
            .await
            .with_context(|| format!("failed to upsert document {rel}"))?;
        self.store
            .delete_chunks_for_document(doc_id)
            .await
            .with_context(|| format!("failed to clear old chunks for {rel}"))?;

        let chunks = chunk_markdown(&content);
        debug!(path = rel, chunks = chunks.len(), "chunked note");

        let mut pending = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk_id = self
                .store
                .insert_chunk(doc_id, chunk)
                .await
                .with_context(|| format!("failed to insert chunk for {rel}"))?;
            pending.push(PendingEmbedding {
                chunk_id,
                text: chunk.content.clone(),
            });
        }

        Ok(pending)
    }

    async fn needs_reindex(
        &self,
        rel: &str,
        full_reindex: bool,
        existing: Option<&Document>,
    ) -> Result<bool> {
        if full_reindex {
            return Ok(true);
        }
        let Some(doc) = existing else {
            return Ok(true);
        };

        let metadata = tokio::fs::metadata(self.root.join(rel))
            .await
            .with_context(|| format!("failed to stat {rel}"))?;
        let modified_at = epoch_seconds(
            metadata
                .modified()
                .with_context(|| format!("no modification time for {rel}"))?,
        )?;
        Ok(modified_at > doc.modified_at)
    }

    /// Enumerate note files under the root, relative paths, hidden
    /// directories and their subtrees skipped.
    fn collect_note_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .sort_by_file_name(|a: &std::ffi::OsStr, b: &std::ffi::OsStr| a.cmp(b))
            .build();

        for entry in walker {
            let entry =
                entry.with_context(|| format!("failed to walk {}", self.root.display()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if !is_note_file(entry.path()) {
                continue;
            }
            let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            files.push(rel.to_string_lossy().into_owned());
        }

        Ok(files)
    }
}

pub(crate) fn is_note_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn epoch_seconds(time: SystemTime) -> Result<i64> {
    Ok(time
        .duration_since(UNIX_EPOCH)
        .context("modification time predates the epoch")?
        .as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_file_extension_is_case_insensitive() {
        assert!(is_note_file(Path::new("a.md")));
        assert!(is_note_file(Path::new("b.MD")));
        assert!(!is_note_file(Path::new("c.txt")));
        assert!(!is_note_file(Path::new("md")));
    }
}
