//! Embedding generation for manual chunks and queries.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::progress::ProgressReporter;
use patriot_core::{AppError, AppResult};

/// Embed texts in batches of `batch_size`, reporting progress after each batch.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    progress: &ProgressReporter,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let total = texts.len() as u64;
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let batch_embeddings = provider.embed_batch(batch).await?;
        if batch_embeddings.len() != batch.len() {
            return Err(AppError::Knowledge(format!(
                "Provider returned {} embeddings for {} texts",
                batch_embeddings.len(),
                batch.len()
            )));
        }
        embeddings.extend(batch_embeddings);
        progress.embed(embeddings.len() as u64, Some(total), provider.model_name());
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
