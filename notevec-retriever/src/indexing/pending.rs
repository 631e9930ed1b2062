//! The watcher's shared pending-path state.
//!
//! One mutex-guarded structure holds everything the two watcher tasks
//! coordinate through: the debounce map (path → last event time), the set of
//! paths with a reindex in flight, and tombstones for paths deleted while a
//! reindex was running. All mutations are atomic; the lock is never held
//! across an await.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct PendingState {
    pending: HashMap<String, Instant>,
    in_flight: HashSet<String>,
    tombstones: HashSet<String>,
}

/// Lock-guarded pending set shared by the event and sweep tasks.
#[derive(Debug, Default)]
pub struct PendingSet {
    state: Mutex<PendingState>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a create/write event: insert the path or refresh its
    /// timestamp in place. A later change supersedes any earlier delete.
    pub fn mark_changed(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.tombstones.remove(path);
        state.pending.insert(path.to_string(), Instant::now());
    }

    /// Record a delete/rename-away event: drop any pending entry so the
    /// debounce never fires, and tombstone the path if a reindex is
    /// currently in flight so the sweep can re-delete afterwards.
    pub fn mark_removed(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.pending.remove(path);
        if state.in_flight.contains(path) {
            state.tombstones.insert(path.to_string());
        }
    }

    /// Remove and return every path quiet for at least `window`, skipping
    /// paths that already have a reindex in flight. Returned paths are
    /// marked in flight until [`finish`](Self::finish) is called.
    pub fn drain_expired(&self, window: Duration) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let due: Vec<String> = state
            .pending
            .iter()
            .filter(|(path, last_event)| {
                now.duration_since(**last_event) >= window
                    && !state.in_flight.contains(path.as_str())
            })
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            state.pending.remove(path);
            state.in_flight.insert(path.clone());
        }
        due
    }

    /// Mark a reindex as complete. Returns true if the path was deleted
    /// while the reindex was in flight, in which case the caller must
    /// delete the document again so the delete wins.
    pub fn finish(&self, path: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        state.in_flight.remove(path);
        state.tombstones.remove(path)
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn repeated_changes_refresh_in_place() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        set.mark_changed("a.md");
        set.mark_changed("a.md");
        assert_eq!(set.pending_len(), 1);
    }

    #[test]
    fn drain_honors_debounce_window() {
        let set = PendingSet::new();
        set.mark_changed("a.md");

        // Too fresh to drain.
        assert!(set.drain_expired(Duration::from_millis(50)).is_empty());
        assert_eq!(set.pending_len(), 1);

        sleep(Duration::from_millis(60));
        let due = set.drain_expired(Duration::from_millis(50));
        assert_eq!(due, vec!["a.md".to_string()]);
        assert_eq!(set.pending_len(), 0);
    }

    #[test]
    fn refresh_postpones_drain() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        sleep(Duration::from_millis(40));
        set.mark_changed("a.md");
        // The refreshed timestamp keeps the path out of this drain.
        assert!(set.drain_expired(Duration::from_millis(50)).is_empty());
    }

    #[test]
    fn removed_paths_never_drain() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        set.mark_removed("a.md");
        sleep(Duration::from_millis(10));
        assert!(set.drain_expired(Duration::ZERO).is_empty());
    }

    #[test]
    fn in_flight_paths_are_not_drained_twice() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        let due = set.drain_expired(Duration::ZERO);
        assert_eq!(due.len(), 1);

        // A change arriving mid-flight queues up but cannot drain until the
        // first reindex finishes.
        set.mark_changed("a.md");
        assert!(set.drain_expired(Duration::ZERO).is_empty());

        assert!(!set.finish("a.md"));
        let due = set.drain_expired(Duration::ZERO);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn delete_during_flight_is_reported_once() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        let due = set.drain_expired(Duration::ZERO);
        assert_eq!(due.len(), 1);

        set.mark_removed("a.md");
        assert!(set.finish("a.md"), "delete during flight must be reported");
        assert!(!set.finish("a.md"), "tombstone is consumed");
    }

    #[test]
    fn change_after_delete_clears_tombstone() {
        let set = PendingSet::new();
        set.mark_changed("a.md");
        set.drain_expired(Duration::ZERO);

        set.mark_removed("a.md");
        set.mark_changed("a.md");
        // The re-create superseded the delete; no re-deletion wanted.
        assert!(!set.finish("a.md"));
        assert_eq!(set.pending_len(), 1);
    }
}
