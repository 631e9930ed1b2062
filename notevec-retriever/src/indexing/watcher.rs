//! Debounced file watching with single-document reindexing.
//!
//! Two background tasks cooperate through one [`PendingSet`]: the event task
//! consumes raw filesystem notifications and updates the set; the sweep task
//! ticks on a short interval, drains paths that have been quiet for the
//! debounce window, and reindexes them outside the lock. Delete and rename
//! events bypass the debounce and remove the document immediately; if a
//! reindex for the same path is already running, the path is tombstoned and
//! the document deleted again once the reindex commits, so a delete always
//! wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::indexer::{Indexer, is_note_file};
use super::pending::PendingSet;

/// Timing knobs for the watcher. Defaults match production; tests shrink
/// them to run the state machine at millisecond scale.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period required after the last event before reindexing.
    pub debounce_window: Duration,
    /// How often the sweep task checks for expired entries.
    pub sweep_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(2),
            sweep_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathAction {
    Changed,
    Removed,
}

/// State shared by the event and sweep tasks.
pub(crate) struct WatchState {
    pub(crate) indexer: Arc<Indexer>,
    pub(crate) root: PathBuf,
    pub(crate) pending: PendingSet,
    pub(crate) config: WatcherConfig,
}

impl WatchState {
    pub(crate) async fn handle_event(&self, event: Event) {
        for (rel, action) in classify_event(&self.root, &event) {
            match action {
                PathAction::Changed => {
                    debug!(path = %rel, "detected change");
                    self.pending.mark_changed(&rel);
                }
                PathAction::Removed => {
                    self.pending.mark_removed(&rel);
                    match self.indexer.store().delete_document(&rel).await {
                        Ok(()) => info!(path = %rel, "removed from index"),
                        Err(err) => error!(path = %rel, "failed to remove document: {err:#}"),
                    }
                }
            }
        }
    }

    pub(crate) async fn sweep_once(&self) {
        let due = self.pending.drain_expired(self.config.debounce_window);
        for rel in due {
            info!(path = %rel, "indexing");
            match self.indexer.reindex_file(&rel).await {
                Ok(()) => info!(path = %rel, "indexed"),
                Err(err) => error!(path = %rel, "failed to index: {err:#}"),
            }
            // A delete that raced the reindex wins: remove the document the
            // reindex may have just resurrected.
            if self.pending.finish(&rel) {
                if let Err(err) = self.indexer.store().delete_document(&rel).await {
                    error!(path = %rel, "failed to remove document after reindex: {err:#}");
                }
            }
        }
    }
}

/// Watches a notes tree and keeps the index in sync with edits.
pub struct NoteWatcher {
    indexer: Arc<Indexer>,
    config: WatcherConfig,
    shutdown: watch::Sender<bool>,
    fs_watcher: Option<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl NoteWatcher {
    pub fn new(indexer: Arc<Indexer>, config: WatcherConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            indexer,
            config,
            shutdown,
            fs_watcher: None,
            tasks: Vec::new(),
        }
    }

    /// Register watches and spawn the event and sweep tasks.
    pub fn start(&mut self) -> Result<()> {
        let root = self
            .indexer
            .root()
            .canonicalize()
            .with_context(|| format!("notes root {} is not accessible", self.indexer.root().display()))?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut fs_watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                // Runs on notify's own thread; sending never blocks.
                let _ = events_tx.send(result);
            },
            notify::Config::default(),
        )
        .context("failed to create file watcher")?;

        let watched = register_watches(&mut fs_watcher, &root)?;
        info!(root = %root.display(), directories = watched, "watching for changes");
        self.fs_watcher = Some(fs_watcher);

        let state = Arc::new(WatchState {
            indexer: self.indexer.clone(),
            root,
            pending: PendingSet::new(),
            config: self.config.clone(),
        });

        self.tasks.push(tokio::spawn(run_event_loop(
            state.clone(),
            events_rx,
            self.shutdown.subscribe(),
        )));
        self.tasks.push(tokio::spawn(run_sweep_loop(
            state,
            self.shutdown.subscribe(),
        )));

        Ok(())
    }

    /// Signal both tasks to stop, wait for them (in-flight reindexes run to
    /// completion), then release the notification handle.
    pub async fn stop(mut self) -> Result<()> {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            task.await.context("watcher task panicked")?;
        }
        drop(self.fs_watcher.take());
        Ok(())
    }
}

/// Watch every non-hidden directory under the root, non-recursively, so
/// hidden subtrees generate no events at all.
fn register_watches(watcher: &mut RecommendedWatcher, root: &Path) -> Result<usize> {
    let mut count = 0;
    let walker = WalkBuilder::new(root)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .build();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if entry.file_type().is_some_and(|t| t.is_dir()) {
            watcher
                .watch(entry.path(), RecursiveMode::NonRecursive)
                .with_context(|| format!("failed to watch {}", entry.path().display()))?;
            count += 1;
        }
    }
    Ok(count)
}

async fn run_event_loop(
    state: Arc<WatchState>,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            next = events.recv() => match next {
                Some(Ok(event)) => state.handle_event(event).await,
                Some(Err(err)) => warn!("watch error: {err}"),
                None => {
                    warn!("notification channel closed, stopping watch loop");
                    break;
                }
            },
        }
    }
}

async fn run_sweep_loop(state: Arc<WatchState>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(state.config.sweep_interval);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => state.sweep_once().await,
        }
    }
}

/// Map a notification onto per-path actions, filtering out anything that is
/// not a visible note under the root.
pub(crate) fn classify_event(root: &Path, event: &Event) -> Vec<(String, PathAction)> {
    let action_for = |position: usize| -> Option<PathAction> {
        match &event.kind {
            EventKind::Create(_) => Some(PathAction::Changed),
            EventKind::Remove(_) => Some(PathAction::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(PathAction::Removed),
            // A paired rename carries [from, to].
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Some(if position == 0 {
                PathAction::Removed
            } else {
                PathAction::Changed
            }),
            EventKind::Modify(_) => Some(PathAction::Changed),
            _ => None,
        }
    };

    event
        .paths
        .iter()
        .enumerate()
        .filter_map(|(position, path)| {
            let action = action_for(position)?;
            let rel = relative_note_path(root, path)?;
            Some((rel, action))
        })
        .collect()
}

/// Root-relative path of a note, or None for non-notes, paths outside the
/// root, and paths with a hidden component.
fn relative_note_path(root: &Path, path: &Path) -> Option<String> {
    if !is_note_file(path) {
        return None;
    }
    let rel = path.strip_prefix(root).ok()?;
    if rel
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    {
        return None;
    }
    Some(rel.to_string_lossy().into_owned())
}
