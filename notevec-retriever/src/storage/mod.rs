pub mod note_index;

pub use note_index::{Document, NoteIndex, SearchCandidate};
