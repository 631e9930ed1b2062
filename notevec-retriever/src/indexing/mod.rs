pub mod indexer;
pub mod pending;
pub mod watcher;

pub use indexer::{EMBED_BATCH_SIZE, Indexer, PendingEmbedding, Progress, ProgressFn};
pub use pending::PendingSet;
pub use watcher::{NoteWatcher, WatcherConfig};
