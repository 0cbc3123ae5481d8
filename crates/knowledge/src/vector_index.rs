//! Vector index abstraction for manual chunks.

use crate::types::KnowledgeChunk;
use patriot_core::AppResult;

/// Trait for vector index backends.
///
/// Besides chunk storage an index records the fingerprint of the manual and
/// settings it was built from, so a matching index can be reused.
pub trait VectorIndex: Send + Sync {
    /// Insert or update a chunk with its embedding.
    fn upsert_chunk(&mut self, chunk: &KnowledgeChunk) -> AppResult<()>;

    /// Insert or update many chunks.
    fn upsert_chunks(&mut self, chunks: &[KnowledgeChunk]) -> AppResult<()> {
        for chunk in chunks {
            self.upsert_chunk(chunk)?;
        }
        Ok(())
    }

    /// Top-k chunks ordered by descending cosine similarity to the query.
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>>;

    /// Returns (distinct pages, chunks).
    fn stats(&self) -> AppResult<(u32, u32)>;

    /// Remove all chunks and the stored fingerprint.
    fn reset(&mut self) -> AppResult<()>;

    /// Fingerprint of the last completed build, if any.
    fn fingerprint(&self) -> AppResult<Option<String>>;

    /// Record a completed build.
    fn set_fingerprint(&mut self, fingerprint: &str) -> AppResult<()>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
