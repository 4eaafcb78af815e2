//! Text chunking.
//!
//! The post-processor talks to a [`Chunker`]: a pure function from text, size
//! and overlap to ordered chunk strings. Two implementations ship:
//!
//! - [`FixedWindowChunker`] (default): character windows that overlap by exactly
//!   `overlap` characters, so the original text can be rebuilt by dropping the
//!   first `overlap` characters of every chunk after the first.
//! - [`TextSplitterChunker`] (feature `chunking`): `text-splitter` based,
//!   respects word, sentence and optionally Markdown boundaries.
//!
//! # Example
//!
//! ```rust
//! use docextract::chunking::{Chunker, FixedWindowChunker};
//!
//! # fn example() -> docextract::Result<()> {
//! let text = "a".repeat(1200);
//! let chunks = FixedWindowChunker.chunk(&text, 500, 50)?;
//! assert_eq!(chunks.len(), 3);
//! # Ok(())
//! # }
//! ```
use crate::error::{DocExtractError, Result};
use crate::types::{Chunk, ChunkMetadata};

/// Splits text into ordered chunk strings. Must be deterministic.
pub trait Chunker: Send + Sync {
    fn name(&self) -> &str;

    fn chunk(&self, text: &str, size: usize, overlap: usize) -> Result<Vec<String>>;
}

fn check_bounds(size: usize, overlap: usize) -> Result<()> {
    if size == 0 {
        return Err(DocExtractError::chunking("chunk size must be positive"));
    }
    if overlap >= size {
        return Err(DocExtractError::chunking(format!(
            "overlap ({overlap}) must be smaller than chunk size ({size})"
        )));
    }
    Ok(())
}

/// Fixed character windows advancing by `size - overlap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWindowChunker;

impl Chunker for FixedWindowChunker {
    fn name(&self) -> &str {
        "fixed-window"
    }

    fn chunk(&self, text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
        check_bounds(size, overlap)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let chars: Vec<char> = text.chars().collect();
        let step = size - overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

/// Boundary-aware chunking through `text-splitter`.
#[cfg(feature = "chunking")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSplitterChunker {
    pub markdown: bool,
}

#[cfg(feature = "chunking")]
impl Chunker for TextSplitterChunker {
    fn name(&self) -> &str {
        if self.markdown { "markdown" } else { "text" }
    }

    fn chunk(&self, text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
        use text_splitter::{ChunkCapacity, ChunkConfig, MarkdownSplitter, TextSplitter};

        check_bounds(size, overlap)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let config = ChunkConfig::new(ChunkCapacity::new(size))
            .with_overlap(overlap)
            .map(|config| config.with_trim(true))
            .map_err(|e| DocExtractError::chunking_with_source("Invalid chunking configuration", e))?;

        let chunks = if self.markdown {
            MarkdownSplitter::new(config).chunks(text).map(str::to_string).collect()
        } else {
            TextSplitter::new(config).chunks(text).map(str::to_string).collect()
        };
        Ok(chunks)
    }
}

/// Attach positions to chunk strings by locating each one in `text`.
///
/// A chunk is first expected where it would start if it shared exactly
/// `overlap` characters with its predecessor; otherwise it is searched for
/// after the previous chunk's start. A chunk that cannot be located at all is
/// placed at the previous chunk's end.
pub fn locate_chunks(text: &str, pieces: Vec<String>, overlap: usize) -> Vec<Chunk> {
    let total_chunks = pieces.len();
    let mut previous: Option<(usize, usize)> = None;

    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| {
            let byte_start = match previous {
                None => text.find(content.as_str()).unwrap_or(0),
                Some((prev_start, prev_end)) => {
                    let expected = back_chars(text, prev_end, overlap).max(next_char_boundary(text, prev_start));
                    if text.get(expected..).is_some_and(|rest| rest.starts_with(content.as_str())) {
                        expected
                    } else {
                        let search_from = next_char_boundary(text, prev_start);
                        text.get(search_from..)
                            .and_then(|rest| rest.find(content.as_str()))
                            .map(|pos| search_from + pos)
                            .unwrap_or(prev_end)
                    }
                }
            };
            let byte_end = (byte_start + content.len()).min(text.len());
            previous = Some((byte_start, byte_end));

            Chunk {
                content,
                metadata: ChunkMetadata {
                    byte_start,
                    byte_end,
                    chunk_index,
                    total_chunks,
                },
            }
        })
        .collect()
}

/// Byte index `count` characters before `from`.
fn back_chars(text: &str, from: usize, count: usize) -> usize {
    let Some(head) = text.get(..from) else {
        return from;
    };
    head.char_indices().rev().take(count).last().map(|(i, _)| i).unwrap_or(from)
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    text.get(from..)
        .and_then(|rest| rest.chars().next())
        .map(|c| from + c.len_utf8())
        .unwrap_or(text.len())
}
