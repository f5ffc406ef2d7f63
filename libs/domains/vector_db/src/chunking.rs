//! Splitting documents into bounded, overlapping passages.

use crate::error::{VectorDbError, VectorDbResult};

/// Chunk size used when the embedding engine does not report one
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Characters shared by consecutive chunks
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

pub trait TextSplitter: Send + Sync {
    /// Split `text` into chunks of at most `chunk_size` characters, consecutive
    /// chunks sharing exactly `overlap` characters.
    fn split(&self, text: &str, chunk_size: usize, overlap: usize) -> VectorDbResult<Vec<String>>;
}

/// Sliding character window that prefers to end chunks on whitespace.
///
/// Sizes are counted in `char`s, never bytes, so multi-byte text is never cut
/// inside a code point. A chunk ends at the last whitespace within the final
/// fifth of its window when there is one; the next chunk always starts exactly
/// `overlap` characters before the previous end.
#[derive(Debug, Clone, Default)]
pub struct CharacterTextSplitter;

impl CharacterTextSplitter {
    pub fn new() -> Self {
        Self
    }
}

impl TextSplitter for CharacterTextSplitter {
    fn split(&self, text: &str, chunk_size: usize, overlap: usize) -> VectorDbResult<Vec<String>> {
        if chunk_size == 0 {
            return Err(VectorDbError::InvalidArgument(
                "chunk size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(VectorDbError::InvalidArgument(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                overlap, chunk_size
            )));
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.iter().all(|c| c.is_whitespace()) {
            return Ok(Vec::new());
        }
        if chars.len() <= chunk_size {
            return Ok(vec![text.to_string()]);
        }

        let lookback = (chunk_size / 5).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let window_end = (start + chunk_size).min(chars.len());
            let mut end = window_end;

            if window_end < chars.len() {
                // Never back off so far that the next start fails to advance.
                let floor = (start + overlap + 1).max(window_end.saturating_sub(lookback));
                if let Some(pos) = (floor..window_end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = pos + 1;
                }
            }

            chunks.push(chars[start..end].iter().collect());

            if end == chars.len() {
                break;
            }
            start = end - overlap;
        }

        Ok(chunks)
    }
}
