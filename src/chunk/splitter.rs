//! Recursive character text splitting
//!
//! Splits raw text into bounded-size chunks by trying a prioritized list of
//! separators. Pieces that fit are greedily merged back together; pieces that
//! are still too large descend to the next separator. The empty-string
//! separator at the end of the list falls back to raw character windows,
//! which guarantees termination.
//!
//! Boundaries are deterministic: the same text and parameters always produce
//! the same chunks, which record hashing upstream depends on.

use crate::config::ChunkConfig;
use crate::error::{Error, Result};

/// Recursive character splitter with a fixed maximum chunk size and overlap.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    max_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter, rejecting invalid parameters up front.
    ///
    /// `overlap >= max_size` can never make progress and is a configuration
    /// error at construction, not at call time.
    pub fn new(max_size: usize, overlap: usize, separators: Vec<String>) -> Result<Self> {
        if max_size == 0 {
            return Err(Error::Config(
                "splitter max_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= max_size {
            return Err(Error::Config(format!(
                "splitter overlap ({}) must be smaller than max_size ({})",
                overlap, max_size
            )));
        }
        Ok(Self {
            max_size,
            overlap,
            separators,
        })
    }

    /// Build a splitter from the chunking section of the config.
    pub fn from_config(config: &ChunkConfig) -> Result<Self> {
        Self::new(config.max_size, config.overlap, config.separators.clone())
    }

    /// Maximum chunk size in characters.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered chunks of at most `max_size` characters.
    ///
    /// Empty input yields an empty sequence. Output preserves the original
    /// left-to-right order; nothing is reordered or deduplicated.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        if char_len(text) <= self.max_size {
            return vec![text.to_string()];
        }

        let Some((sep, rest)) = separators.split_first() else {
            return self.split_chars(text);
        };

        if sep.is_empty() {
            return self.split_chars(text);
        }

        let pieces: Vec<&str> = text.split(sep.as_str()).collect();
        if pieces.len() == 1 {
            // Separator absent from this text, descend to the next one
            return self.split_recursive(text, rest);
        }

        self.merge_pieces(&pieces, sep, rest)
    }

    /// Greedily accumulate split pieces into chunks, re-joining them with the
    /// separator and seeding each new buffer with the trailing `overlap`
    /// characters of the previous chunk.
    fn merge_pieces(&self, pieces: &[&str], sep: &str, rest: &[String]) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut chunks: Vec<String> = Vec::new();
        let mut buf = String::new();
        let mut buf_len = 0usize;
        // True once the buffer holds content beyond an overlap seed; a buffer
        // containing only the seed is never emitted as a chunk.
        let mut fresh = false;

        for &piece in pieces {
            let piece_len = char_len(piece);

            if piece_len > self.max_size {
                // This piece cannot fit any chunk: flush what we have and
                // recurse into it with the next separator.
                if fresh {
                    chunks.push(std::mem::take(&mut buf));
                } else {
                    buf.clear();
                }
                chunks.extend(self.split_recursive(piece, rest));

                buf = String::new();
                buf_len = 0;
                fresh = false;
                if self.overlap > 0 {
                    if let Some(last) = chunks.last() {
                        let tail = tail_chars(last, self.overlap);
                        buf_len = char_len(tail);
                        buf.push_str(tail);
                    }
                }
                continue;
            }

            let joined_len = if buf.is_empty() {
                piece_len
            } else {
                buf_len + sep_len + piece_len
            };

            if joined_len <= self.max_size {
                if buf.is_empty() {
                    if !piece.is_empty() {
                        buf.push_str(piece);
                        buf_len = piece_len;
                        fresh = true;
                    }
                } else {
                    buf.push_str(sep);
                    buf.push_str(piece);
                    buf_len += sep_len + piece_len;
                    fresh = true;
                }
                continue;
            }

            if !fresh {
                // Only an overlap seed in the buffer; restart from the piece
                // so flush boundaries stay at separator positions.
                buf.clear();
                buf.push_str(piece);
                buf_len = piece_len;
                fresh = true;
                continue;
            }

            // Flush the buffer as a chunk and start the next one seeded with
            // the trailing overlap of the chunk just flushed.
            let finished = std::mem::take(&mut buf);
            let tail = if self.overlap > 0 {
                tail_chars(&finished, self.overlap).to_string()
            } else {
                String::new()
            };
            chunks.push(finished);

            let tail_len = char_len(&tail);
            if !tail.is_empty() && tail_len + sep_len + piece_len <= self.max_size {
                buf = tail;
                buf.push_str(sep);
                buf.push_str(piece);
                buf_len = tail_len + sep_len + piece_len;
            } else {
                // Seed plus piece would exceed max_size; the separator
                // boundary wins over the overlap seed.
                buf = piece.to_string();
                buf_len = piece_len;
            }
            fresh = true;
        }

        if fresh && !buf.is_empty() {
            chunks.push(buf);
        }

        chunks
    }

    /// Raw character-window fallback; the overlap is preserved by stepping
    /// windows by `max_size - overlap` (positive by construction).
    fn split_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }

        let step = self.max_size - self.overlap;
        let mut out = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.max_size).min(total);
            out.push(chars[start..end].iter().collect());
            if end == total {
                break;
            }
            start += step;
        }
        out
    }
}

/// Number of Unicode scalar values in `s`.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s`, on a valid char boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    match s.char_indices().nth(count - n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}
