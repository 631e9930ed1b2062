//! Line-oriented Markdown chunking.
//!
//! The chunker scans a note once, line by line, maintaining an accumulation
//! buffer and a stack of active headings indexed by level. A heading line
//! flushes the buffer under the heading that was active *before* it, then
//! rewrites the stack; a buffer that outgrows the size budget flushes
//! mid-section, so long sections produce several chunks sharing one
//! breadcrumb. Flushed buffers shorter than [`MIN_CHUNK_CHARS`] (after
//! trimming) are dropped — bare headings and blank tails never become chunks.
//!
//! ```
//! use notevec_context::chunk_markdown;
//!
//! let chunks = chunk_markdown("# Recipes\n\nA reliable bread recipe needs time more than skill.\n");
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].heading, "Recipes");
//! assert_eq!(chunks[0].start_line, 1);
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Size budget per chunk, in tokens.
pub const MAX_CHUNK_TOKENS: usize = 500;
/// Rough bytes-per-token estimate used to apply the budget without a tokenizer.
pub const AVG_CHARS_PER_TOKEN: usize = 4;
/// Trimmed chunks at or below this length are dropped.
pub const MIN_CHUNK_CHARS: usize = 20;

/// A bounded slice of a note: the unit of embedding and retrieval.
///
/// `start_line` and `end_line` are 1-based and inclusive; `end_line` is the
/// last line that was appended to the chunk's buffer. `heading` is the
/// " > "-joined stack of headings active at `start_line`, empty before the
/// first heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub heading: String,
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap())
}

fn flush_buffer(
    chunks: &mut Vec<Chunk>,
    buffer: &mut String,
    start_line: usize,
    end_line: usize,
    heading: &str,
) {
    let trimmed = buffer.trim();
    if trimmed.len() > MIN_CHUNK_CHARS {
        chunks.push(Chunk {
            content: trimmed.to_string(),
            start_line,
            end_line,
            heading: heading.to_string(),
        });
    }
    buffer.clear();
}

/// Split note text into ordered, heading-aware, size-bounded chunks.
///
/// Produced ranges are non-decreasing and non-overlapping. Empty input and
/// input made entirely of sub-threshold fragments yield an empty vector.
///
/// ```
/// use notevec_context::chunk_markdown;
///
/// let text = "# A\n\nSome introductory prose that is long enough to keep.\n\n## B\n\nMore prose under the nested heading, also long enough.\n";
/// let chunks = chunk_markdown(text);
/// assert_eq!(chunks[0].heading, "A");
/// assert_eq!(chunks[1].heading, "A > B");
/// ```
pub fn chunk_markdown(content: &str) -> Vec<Chunk> {
    let max_chunk_bytes = MAX_CHUNK_TOKENS * AVG_CHARS_PER_TOKEN;

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut stack: Vec<String> = Vec::new();
    let mut heading = String::new();
    let mut start_line = 1usize;
    let mut last_line = 0usize;

    for (idx, line) in content.split('\n').enumerate() {
        let line_no = idx + 1;
        last_line = line_no;

        if let Some(caps) = heading_regex().captures(line) {
            // The buffer so far belongs to the heading active before this line.
            flush_buffer(&mut chunks, &mut buffer, start_line, line_no - 1, &heading);
            start_line = line_no;

            let level = caps[1].len();
            stack.truncate(level - 1);
            stack.push(caps[2].to_string());
            heading = stack.join(" > ");
        }

        buffer.push_str(line);
        buffer.push('\n');

        if buffer.len() > max_chunk_bytes {
            flush_buffer(&mut chunks, &mut buffer, start_line, line_no, &heading);
            start_line = line_no + 1;
        }
    }

    flush_buffer(&mut chunks, &mut buffer, start_line, last_line, &heading);

    chunks
}

/// Derive a display title for a note.
///
/// The first trimmed line starting with a single `#` heading marker supplies
/// the title; without one, the filename minus its extension is used.
pub fn extract_title(content: &str, rel_path: &str) -> String {
    for line in content.lines() {
        if let Some(rest) = line.trim().strip_prefix("# ") {
            return rest.to_string();
        }
    }

    Path::new(rel_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string())
}
