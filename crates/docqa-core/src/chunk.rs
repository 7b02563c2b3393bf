//! Overlapping word-window chunker.
//!
//! Splits document text into [`Chunk`]s of `chunk_size` whitespace-delimited
//! words. Consecutive chunks share `overlap` words so that a passage cut at a
//! window boundary still appears whole in at least one chunk.
//!
//! # Algorithm
//!
//! 1. Tokenize the text on Unicode whitespace.
//! 2. Starting at word 0, take `chunk_size` words and join them with single
//!    spaces.
//! 3. Advance the start by `step = chunk_size - overlap`.
//! 4. Stop once a window has reached the last word. The final chunk may be
//!    shorter than `chunk_size`; it is never padded.
//!
//! `overlap >= chunk_size` would make the step non-positive and is rejected
//! up front with [`CoreError::Validation`].
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::new(4, 1).unwrap();
//! let chunks = chunk_text("the quick brown fox jumps over the lazy dog", &params).unwrap();
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, ["the quick brown fox", "fox jumps over the", "the lazy dog"]);
//! ```

use serde::Serialize;

use crate::error::{CoreError, Result};

/// Default window size in words.
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Default number of words shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 20;

/// A contiguous word window drawn from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Rank of this chunk in the originating sequence (`0..N`).
    pub index: usize,
    /// Window words joined by single spaces.
    pub text: String,
    /// Position of the first word in the tokenized document.
    pub start_word: usize,
    /// Number of words in the window.
    pub word_count: usize,
}

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Validate and build chunking parameters.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] if `chunk_size == 0` or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CoreError::Validation("chunk_size must be > 0".to_string()));
        }
        if overlap >= chunk_size {
            return Err(CoreError::Validation(format!(
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

    /// Number of words the window start advances between chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split text into overlapping word windows.
///
/// Returns chunks with contiguous indices starting at 0. Empty or
/// whitespace-only text yields no chunks.
///
/// # Guarantees
///
/// - `chunks.len() == expected_chunk_count(word_count, params)`.
/// - Chunk `k` starts at word `k * step`.
/// - Every chunk except possibly the last holds exactly `chunk_size` words.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Result<Vec<Chunk>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut chunks = Vec::with_capacity(expected_chunk_count(words.len(), params));

    let mut start = 0usize;
    while start < words.len() {
        let end = (start + params.chunk_size).min(words.len());
        chunks.push(Chunk {
            index: chunks.len(),
            text: words[start..end].join(" "),
            start_word: start,
            word_count: end - start,
        });
        if end == words.len() {
            break;
        }
        start += params.step();
    }

    Ok(chunks)
}

/// Number of chunks [`chunk_text`] produces for `word_count` words.
pub fn expected_chunk_count(word_count: usize, params: &ChunkParams) -> usize {
    if word_count == 0 {
        0
    } else if word_count <= params.overlap {
        1
    } else {
        (word_count - params.overlap).div_ceil(params.step())
    }
}
