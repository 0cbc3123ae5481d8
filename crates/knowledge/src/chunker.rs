//! Page-aware text chunking.

use crate::parser::Manual;
use crate::types::ChunkCandidate;
use patriot_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Split every page of the manual into overlapping chunks.
///
/// Sizes are measured in characters. Pages are split independently so every
/// chunk belongs to exactly one page. Whitespace-only pieces are skipped.
pub fn chunk_manual(
    manual: &Manual,
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<ChunkCandidate>> {
    if chunk_size == 0 {
        return Err(AppError::Knowledge(
            "Chunk size must be greater than zero".to_string(),
        ));
    }

    if overlap >= chunk_size {
        return Err(AppError::Knowledge(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Knowledge(format!("Invalid chunk configuration: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let mut candidates = Vec::new();
    let mut position = 0u32;

    for page in &manual.pages {
        for (offset, text) in splitter.chunk_indices(&page.text) {
            if text.trim().is_empty() {
                continue;
            }

            candidates.push(ChunkCandidate {
                page: page.number - 1,
                position,
                text: text.to_string(),
                byte_range: (offset, offset + text.len()),
            });
            position += 1;
        }
    }

    tracing::info!(
        "Split {} pages into {} chunks (size {}, overlap {})",
        manual.page_count(),
        candidates.len(),
        chunk_size,
        overlap
    );

    Ok(candidates)
}
