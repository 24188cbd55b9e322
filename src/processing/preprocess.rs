//! Text normalization and fixed-size chunking.
//!
//! Extracted document text is noisy: PDF layout leaves runs of whitespace, ligatures, bullets and
//! box-drawing characters. Normalization keeps letters, digits and the punctuation legal prose
//! relies on (`. , ; : ( ) [ ] { } ' " -`), replaces everything else with a space, and collapses
//! whitespace. Chunking then partitions the normalized text greedily into runs of at most
//! `max_chunk_chars` characters, ending each run before a space where possible.
//!
//! Chunks are a lossless partition: concatenating their texts in order yields the normalized
//! text. The space at a boundary opens the following chunk.

use super::types::{Chunk, SummarizeError};

/// Default upper bound on characters per chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 300;

/// Normalized document text together with its chunk partition.
#[derive(Debug, Clone)]
pub struct PreparedText {
    /// Text after whitespace collapsing and character filtering.
    pub normalized: String,
    /// Ordered, non-empty chunk sequence covering `normalized`.
    pub chunks: Vec<Chunk>,
}

/// Normalizes raw text and splits it into bounded chunks.
#[derive(Debug, Clone, Copy)]
pub struct TextPreprocessor {
    max_chunk_chars: usize,
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl TextPreprocessor {
    /// Create a preprocessor; a zero bound is raised to one.
    pub fn new(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    /// Effective chunk bound.
    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    /// Normalize and chunk `raw`, failing with [`SummarizeError::EmptyInput`] when nothing
    /// usable remains.
    pub fn prepare(&self, raw: &str) -> Result<PreparedText, SummarizeError> {
        let normalized = normalize_text(raw);
        if normalized.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let chunks = split_into_chunks(&normalized, self.max_chunk_chars);
        if chunks.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        Ok(PreparedText { normalized, chunks })
    }

    /// Convenience wrapper returning only the chunk sequence.
    pub fn chunk(&self, raw: &str) -> Result<Vec<Chunk>, SummarizeError> {
        self.prepare(raw).map(|prepared| prepared.chunks)
    }
}

/// Collapse whitespace, drop characters outside the allow-list, and collapse again.
pub fn normalize_text(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let filtered: String = collapsed
        .chars()
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();
    collapse_whitespace(&filtered)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric()
        || c == '_'
        || c.is_whitespace()
        || matches!(
            c,
            '.' | ',' | ';' | ':' | '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '"' | '-'
        )
}

/// Greedy partition of `text` into runs of at most `max_chars` characters.
///
/// A run ends right before the last whitespace inside its window; when the window holds no usable
/// whitespace (a single token longer than the bound) the run is cut at the bound.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<Chunk> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let char_count = chars.len();
    let offset = |position: usize| {
        if position == char_count {
            text.len()
        } else {
            chars[position].0
        }
    };

    let mut chunks = Vec::with_capacity(char_count / max_chars + 1);
    let mut start = 0usize;
    while start < char_count {
        let limit = (start + max_chars).min(char_count);
        let end = if limit == char_count {
            limit
        } else {
            (start + 1..=limit)
                .rev()
                .find(|&position| chars[position].1.is_whitespace())
                .unwrap_or(limit)
        };

        chunks.push(Chunk {
            index: chunks.len(),
            text: text[offset(start)..offset(end)].to_string(),
        });
        start = end;
    }

    chunks
}
