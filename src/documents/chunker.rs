//! Document Chunking
//!
//! Splits decoded document text into overlapping segments for embedding.
//! Whitespace is collapsed first, then the text is cut into windows of
//! `chunk_size` characters, preferring to end a window just after the last
//! sentence boundary in its second half.
//!
//! All lengths and offsets are counted in `char`s, never bytes.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::errors::{RagError, Result};

/// Default window length in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default number of characters shared by consecutive segments
pub const DEFAULT_OVERLAP: usize = 50;

/// A segment of source text, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment text (never empty)
    pub text: String,
    /// Originating document
    pub source_id: String,
    /// Position among the document's segments, 0-based
    pub sequence_index: usize,
}

/// Sentence-aware sliding-window chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    /// Create a chunker; requires `chunk_size > 0` and `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, non-empty segments
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = normalize_whitespace(text);
        let chars: Vec<char> = normalized.chars().collect();

        self.spans_of(&chars)
            .into_iter()
            .map(|span| chars[span].iter().collect())
            .collect()
    }

    /// Character ranges of each segment over the normalized text
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = normalize_whitespace(text).chars().collect();
        self.spans_of(&chars)
    }

    /// Chunk `text` and tag each piece with its source and position
    pub fn segments(&self, source_id: &str, text: &str) -> Vec<Segment> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Segment {
                text,
                source_id: source_id.to_string(),
                sequence_index,
            })
            .collect()
    }

    fn spans_of(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        if len == 0 {
            return Vec::new();
        }
        if len <= self.chunk_size {
            return vec![0..len];
        }

        let half = self.chunk_size as f64 * 0.5;
        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < len {
            let mut end = start + self.chunk_size;

            if end >= len {
                spans.push(start..len);
                break;
            }

            let window = &chars[start..end];
            let last_period = window.iter().rposition(|&c| c == '.');
            let last_newline = window.iter().rposition(|&c| c == '\n');

            if let Some(break_point) = last_period.max(last_newline) {
                if break_point as f64 > half {
                    end = start + break_point + 1;
                }
            }

            spans.push(start..end);

            // end > start + chunk_size / 2, but overlap may still exceed the
            // distance travelled, so never step backwards.
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        spans
    }
}

/// Collapse whitespace runs into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chunk with explicit parameters
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(chunk_size, overlap)?.chunk(text))
}
