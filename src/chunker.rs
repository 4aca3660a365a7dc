// Fixed-width chunking of extracted text for model input
use crate::config::ChunkingConfig;
use crate::summarizer::Device;

/// Chunk width in characters for the selected device.
///
/// Accelerated hardware takes wider chunks; CPU inference stays narrow to
/// bound memory use per call.
pub fn chunk_size_for(device: &Device, config: &ChunkingConfig) -> usize {
    if device.is_accelerated() {
        config.accelerated_chunk_size
    } else {
        config.cpu_chunk_size
    }
}

/// Split `text` into consecutive, non-overlapping slices of at most `size`
/// characters. No sentence awareness: a chunk may end mid-word.
///
/// Widths count Unicode scalar values, so a slice never splits a character.
/// A `size` of zero is treated as one.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        chunks.push(&text[start..]);
    }
    chunks
}
