//! Oversized-document chunking
//!
//! The AI index rejects very large documents, so texts above a configured
//! maximum are split into bounded, boundary-aware parts before upload. The
//! splitter prefers paragraph boundaries, falls back to sentence boundaries,
//! and hard-cuts only when neither appears inside the backward scan window
//! (the last 20% of the candidate chunk).
//!
//! All indices are character positions, never bytes, so multibyte text
//! splits cleanly. Concatenating the chunk texts in part order reconstructs
//! the input exactly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use kbsync_core::domain::newtypes::NodeId;

/// Default maximum chunk length in characters
pub const DEFAULT_MAX_CHARS: usize = 20_000;

/// Fraction of the maximum length scanned backward for a boundary
const BACKWARD_WINDOW: f64 = 0.8;

/// One part of a split document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Part id: `<parent>_part<n>`, 1-based and contiguous
    pub id: String,
    /// The chunk's text; chunks partition the original exactly
    pub text: String,
    /// Inherited metadata plus split bookkeeping
    pub metadata: HashMap<String, String>,
}

/// Splits oversized texts into boundary-aware chunks
#[derive(Debug, Clone)]
pub struct DocumentChunker {
    max_chars: usize,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl DocumentChunker {
    /// Creates a chunker with the given maximum chunk length
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Returns true if `text` needs splitting
    pub fn is_oversized(&self, text: &str) -> bool {
        text.chars().count() > self.max_chars
    }

    /// Splits `text` into chunks inheriting `metadata`
    ///
    /// Each chunk's metadata additionally carries the original document id,
    /// its 1-based part number, and the split timestamp. Texts within the
    /// limit come back as a single chunk.
    pub fn split(
        &self,
        document_id: &NodeId,
        text: &str,
        metadata: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> Vec<DocumentChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut cursor = 0usize;
        let mut part = 1u32;

        while cursor < total {
            let end = self.cut_point(&chars, cursor, total);
            let chunk_text: String = chars[cursor..end].iter().collect();

            let mut chunk_meta = metadata.clone();
            chunk_meta.insert(
                "original_document_id".to_string(),
                document_id.as_str().to_string(),
            );
            chunk_meta.insert("part_number".to_string(), part.to_string());
            chunk_meta.insert("split_timestamp".to_string(), now.to_rfc3339());

            chunks.push(DocumentChunk {
                id: format!("{}_part{}", document_id, part),
                text: chunk_text,
                metadata: chunk_meta,
            });

            cursor = end;
            part += 1;
        }

        chunks
    }

    /// Chooses where the chunk starting at `cursor` ends
    fn cut_point(&self, chars: &[char], cursor: usize, total: usize) -> usize {
        let candidate = (cursor + self.max_chars).min(total);
        if candidate == total {
            return candidate;
        }

        let window_start = cursor + (self.max_chars as f64 * BACKWARD_WINDOW) as usize;
        let window_start = window_start.min(candidate.saturating_sub(1)).max(cursor);

        // Paragraph boundary: two consecutive newlines, cut between them
        for i in (window_start..candidate).rev() {
            if chars[i] == '\n' && i + 1 < total && chars[i + 1] == '\n' {
                return i + 1;
            }
        }

        // Sentence boundary: terminal punctuation followed by whitespace,
        // cut right after the punctuation
        for i in (window_start..candidate).rev() {
            if matches!(chars[i], '.' | '!' | '?')
                && i + 1 < total
                && chars[i + 1].is_whitespace()
            {
                return i + 1;
            }
        }

        candidate
    }
}
