//! End-to-end watcher tests against real filesystem notifications.
//!
//! Timing knobs are shrunk far below production values; the waits are
//! generous multiples of them to keep the tests stable.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::tempdir;
use tokio::time::sleep;
use tracing_test::traced_test;

use common::HashEmbedder;
use notevec_embed::EmbeddingProvider;
use notevec_retriever::indexing::indexer::Indexer;
use notevec_retriever::indexing::watcher::{NoteWatcher, WatcherConfig};
use notevec_retriever::storage::NoteIndex;

const DIM: usize = 8;

fn fast_config() -> WatcherConfig {
    WatcherConfig {
        debounce_window: Duration::from_millis(150),
        sweep_interval: Duration::from_millis(30),
    }
}

async fn start_watcher(root: &Path) -> Result<(NoteIndex, Arc<HashEmbedder>, NoteWatcher)> {
    let store = NoteIndex::open_memory(DIM).await?;
    let embedder = Arc::new(HashEmbedder::new(DIM));
    let indexer = Arc::new(Indexer::new(
        store.clone(),
        embedder.clone() as Arc<dyn EmbeddingProvider>,
        root.to_path_buf(),
    ));
    let mut watcher = NoteWatcher::new(indexer, fast_config());
    watcher.start()?;
    // Let the watch registration settle before generating events.
    sleep(Duration::from_millis(100)).await;
    Ok((store, embedder, watcher))
}

#[traced_test]
#[tokio::test]
async fn rapid_writes_trigger_exactly_one_reindex() -> Result<()> {
    let temp = tempdir()?;
    let (store, embedder, watcher) = start_watcher(temp.path()).await?;

    for i in 0..5 {
        fs::write(
            temp.path().join("note.md"),
            format!("# Note\n\nRevision {i} of a body long enough to chunk.\n"),
        )?;
        sleep(Duration::from_millis(20)).await;
    }

    // Quiet period: the debounce expires once, the sweep indexes once.
    sleep(Duration::from_millis(800)).await;

    assert_eq!(embedder.call_count(), 1);
    assert!(store.get_document("note.md").await?.is_some());
    assert!(store.chunk_count().await? > 0);
    assert_eq!(store.chunk_count().await?, store.embedding_count().await?);

    watcher.stop().await
}

#[traced_test]
#[tokio::test]
async fn delete_after_indexing_removes_the_document() -> Result<()> {
    let temp = tempdir()?;
    let (store, embedder, watcher) = start_watcher(temp.path()).await?;

    fs::write(
        temp.path().join("note.md"),
        "# Note\n\nA body long enough to produce a stored chunk here.\n",
    )?;
    sleep(Duration::from_millis(800)).await;
    assert_eq!(embedder.call_count(), 1);
    assert!(store.get_document("note.md").await?.is_some());

    fs::remove_file(temp.path().join("note.md"))?;
    sleep(Duration::from_millis(500)).await;

    assert!(store.get_document("note.md").await?.is_none());
    assert_eq!(store.chunk_count().await?, 0);
    assert_eq!(store.embedding_count().await?, 0);

    watcher.stop().await
}

#[traced_test]
#[tokio::test]
async fn delete_within_debounce_window_prevents_indexing() -> Result<()> {
    let temp = tempdir()?;
    let (store, embedder, watcher) = start_watcher(temp.path()).await?;

    fs::write(
        temp.path().join("ephemeral.md"),
        "# Ephemeral\n\nWritten and removed before the debounce expires.\n",
    )?;
    sleep(Duration::from_millis(40)).await;
    fs::remove_file(temp.path().join("ephemeral.md"))?;

    sleep(Duration::from_millis(800)).await;

    assert_eq!(embedder.call_count(), 0);
    assert!(store.get_document("ephemeral.md").await?.is_none());

    watcher.stop().await
}

#[traced_test]
#[tokio::test]
async fn non_note_and_hidden_files_are_ignored() -> Result<()> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join(".trash"))?;
    let (store, embedder, watcher) = start_watcher(temp.path()).await?;

    fs::write(temp.path().join("scratch.txt"), "not a note at all")?;
    fs::write(
        temp.path().join(".trash/discarded.md"),
        "# Discarded\n\nHidden directories never reach the pending set.\n",
    )?;
    sleep(Duration::from_millis(800)).await;

    assert_eq!(embedder.call_count(), 0);
    assert_eq!(store.document_count().await?, 0);

    watcher.stop().await
}
