//! Deterministic sliding-window text chunking.

use crate::error::ChunkError;
use crate::models::Chunk;

/// Split text into bounded, overlapping chunks.
///
/// Walks the text with a window of `chunk_size` characters; after a chunk
/// starting at offset `o`, the next starts at `o + (chunk_size -
/// chunk_overlap)`. Whitespace-only windows are dropped, so the emitted
/// sequence is exactly the document's readable content in reading order.
/// The final chunk may be shorter than `chunk_size`.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_overlap >= chunk_size {
        return Err(ChunkError::InvalidConfiguration {
            size: chunk_size,
            overlap: chunk_overlap,
        });
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if !trimmed.is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                text: trimmed.to_string(),
            });
        }

        start += step;
    }

    Ok(chunks)
}
