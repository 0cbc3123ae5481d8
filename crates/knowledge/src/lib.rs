//! Manual knowledge base and diagnostic pipeline.
//!
//! Loads the owner's manual PDF, splits it into overlapping chunks, embeds
//! them into a local SQLite index and answers questions through the
//! [`DiagnosticAgent`].

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod keyword;
pub mod parser;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod sections;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::SqliteIndex;
pub use parser::{load_manual, Manual, ManualPage};
pub use progress::{IndexPhase, ProgressCallback, ProgressEvent, ProgressReporter};
pub use rag::{AgentSettings, DiagnosticAgent, Diagnosis, HistoryEntry, HistoryKind};
pub use retriever::ManualRetriever;
pub use sections::{extract_sections, Section};
pub use types::{
    BaseStats, IndexOptions, IndexStats, KnowledgeBaseConfig, KnowledgeChunk, SearchHit,
    COLLECTION_NAME,
};
pub use vector_index::VectorIndex;

use patriot_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;

/// Chunks written per SQLite transaction.
const WRITE_BATCH: usize = 200;

/// Identity of an index build: the manual bytes plus every setting that
/// changes the stored vectors.
pub fn compute_fingerprint(manual: &Manual, config: &KnowledgeBaseConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manual.digest.as_bytes());
    for part in [
        config.provider.clone(),
        config.model.clone(),
        config.embedding_dim.to_string(),
        config.chunk_size.to_string(),
        config.chunk_overlap.to_string(),
    ] {
        hasher.update(b"\0");
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Chunk, embed and store the manual in `index`.
///
/// An index whose stored fingerprint matches is reused untouched unless
/// `reindex` is set.
pub async fn build_index(
    index: &mut dyn VectorIndex,
    manual: &Manual,
    config: &KnowledgeBaseConfig,
    provider: &dyn EmbeddingProvider,
    reindex: bool,
    progress: &ProgressReporter,
) -> AppResult<IndexStats> {
    let start = Instant::now();
    let fingerprint = compute_fingerprint(manual, config);
    let source = manual.path.display().to_string();

    progress.load(manual.page_count() as u64, &source);

    if !reindex && index.fingerprint()?.as_deref() == Some(fingerprint.as_str()) {
        let (_, chunks) = index.stats()?;
        tracing::info!("Reusing existing index ({} chunks)", chunks);
        return Ok(IndexStats {
            pages: manual.page_count(),
            chunks,
            reused: true,
            fingerprint,
            duration_secs: start.elapsed().as_secs_f64(),
        });
    }

    tracing::info!(
        "Building index for {:?} ({} pages)",
        manual.path,
        manual.page_count()
    );
    index.reset()?;

    let candidates = chunker::chunk_manual(manual, config.chunk_size, config.chunk_overlap)?;
    progress.chunk(candidates.len() as u64, manual.page_count() as u64);

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let embeddings =
        embeddings::embed_in_batches(provider, &texts, config.batch_size, progress).await?;

    let chunks: Vec<KnowledgeChunk> = candidates
        .into_iter()
        .zip(embeddings)
        .map(|(candidate, embedding)| KnowledgeChunk {
            id: uuid::Uuid::new_v4().to_string(),
            page: candidate.page,
            position: candidate.position,
            metadata: serde_json::json!({
                "source": source,
                "byte_start": candidate.byte_range.0,
                "byte_end": candidate.byte_range.1,
            }),
            text: candidate.text,
            embedding: Some(embedding),
        })
        .collect();

    let total = chunks.len() as u64;
    let mut written = 0u64;
    for batch in chunks.chunks(WRITE_BATCH) {
        index.upsert_chunks(batch)?;
        written += batch.len() as u64;
        progress.index(written, Some(total));
    }

    index.set_fingerprint(&fingerprint)?;

    let duration = start.elapsed();
    tracing::info!(
        "Indexed {} chunks from {} pages in {:.2}s",
        chunks.len(),
        manual.page_count(),
        duration.as_secs_f64()
    );

    Ok(IndexStats {
        pages: manual.page_count(),
        chunks: chunks.len() as u32,
        reused: false,
        fingerprint,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Build (or reuse) the workspace index for a collection.
///
/// Records the embedding provider and model in the collection config and
/// returns the open index for retrieval.
pub async fn index_manual(
    workspace: &Path,
    manual: &Manual,
    options: &IndexOptions,
    provider: &dyn EmbeddingProvider,
    progress: &ProgressReporter,
) -> AppResult<(SqliteIndex, IndexStats)> {
    let mut config = config::load_config(workspace, &options.collection)?;
    config.provider = provider.provider_name().to_string();
    config.model = provider.model_name().to_string();
    config.embedding_dim = provider.dimensions();

    let mut index = SqliteIndex::open(&config::get_index_path(workspace, &options.collection))?;
    let stats = build_index(
        &mut index,
        manual,
        &config,
        provider,
        options.reindex,
        progress,
    )
    .await?;

    config::save_config(workspace, &config)?;
    Ok((index, stats))
}

/// Open an existing collection index.
pub fn open_index(workspace: &Path, collection: &str) -> AppResult<SqliteIndex> {
    let index_path = config::get_index_path(workspace, collection);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Collection '{}' has no index. Run 'patriot knowledge index' first.",
            collection
        )));
    }
    SqliteIndex::open(&index_path)
}

/// Get statistics for a collection.
pub fn stats(workspace: &Path, collection: &str) -> AppResult<BaseStats> {
    tracing::info!("Getting stats for collection '{}'", collection);

    let index = open_index(workspace, collection)?;
    let config = config::load_config(workspace, collection)?;
    let (pages_count, chunks_count) = index.stats()?;

    let db_size_bytes = std::fs::metadata(config::get_index_path(workspace, collection))
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(BaseStats {
        collection: collection.to_string(),
        pages_count,
        chunks_count,
        db_size_bytes,
        embedding_provider: config.provider,
        embedding_model: config.model,
        fingerprint: index.fingerprint()?,
        indexed_at: index.indexed_at()?,
    })
}

/// Drop every chunk of a collection; the next run rebuilds it.
pub fn clean(workspace: &Path, collection: &str) -> AppResult<()> {
    tracing::info!("Cleaning collection '{}'", collection);

    let index_path = config::get_index_path(workspace, collection);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Collection '{}' does not exist",
            collection
        )));
    }

    let mut index = SqliteIndex::open(&index_path)?;
    index.reset()?;

    tracing::info!("Collection '{}' cleaned", collection);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn manual() -> Manual {
        Manual::from_pages(
            "manual.pdf",
            vec![
                "Tire pressure monitoring system. Inflate tires to the pressure on the placard."
                    .to_string(),
                "Engine oil: use SAE 5W-20. Check the level at every fuel stop.".to_string(),
                "Jump starting procedure with a booster battery.".to_string(),
            ],
        )
    }

    fn trigram_config() -> KnowledgeBaseConfig {
        KnowledgeBaseConfig {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            embedding_dim: 384,
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_tracks_manual_and_settings() {
        let config = trigram_config();
        let base = compute_fingerprint(&manual(), &config);
        assert_eq!(base, compute_fingerprint(&manual(), &config));
        assert_eq!(base.len(), 64);

        let other_manual = Manual::from_pages("manual.pdf", vec!["Wipers".to_string()]);
        assert_ne!(base, compute_fingerprint(&other_manual, &config));

        let resized = KnowledgeBaseConfig {
            chunk_size: 500,
            ..trigram_config()
        };
        assert_ne!(base, compute_fingerprint(&manual(), &resized));

        let other_model = KnowledgeBaseConfig {
            model: "nomic-embed-text".to_string(),
            ..trigram_config()
        };
        assert_ne!(base, compute_fingerprint(&manual(), &other_model));
    }

    #[tokio::test]
    async fn test_build_index_then_reuse() {
        let provider = TrigramProvider::new(384);
        let mut index = SqliteIndex::in_memory().unwrap();
        let manual = manual();

        let first = build_index(
            &mut index,
            &manual,
            &trigram_config(),
            &provider,
            false,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert!(!first.reused);
        assert_eq!(first.pages, 3);
        assert_eq!(first.chunks, 3);
        assert_eq!(index.stats().unwrap(), (3, 3));

        let second = build_index(
            &mut index,
            &manual,
            &trigram_config(),
            &provider,
            false,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert!(second.reused);
        assert_eq!(second.chunks, 3);
        assert_eq!(second.fingerprint, first.fingerprint);

        let forced = build_index(
            &mut index,
            &manual,
            &trigram_config(),
            &provider,
            true,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert!(!forced.reused);
        assert_eq!(index.stats().unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn test_build_index_stores_metadata() {
        let provider = TrigramProvider::new(384);
        let mut index = SqliteIndex::in_memory().unwrap();

        build_index(
            &mut index,
            &manual(),
            &trigram_config(),
            &provider,
            false,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        let query = provider.embed("booster battery jump starting").await.unwrap();
        let results = index.search(&query, 1).unwrap();
        let (chunk, _) = &results[0];
        assert_eq!(chunk.page, 2);
        assert_eq!(chunk.metadata["source"], "manual.pdf");
        assert_eq!(chunk.metadata["byte_start"], 0);
    }

    #[tokio::test]
    async fn test_build_index_reports_phases() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let progress = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event.phase);
        }));

        let mut index = SqliteIndex::in_memory().unwrap();
        build_index(
            &mut index,
            &manual(),
            &trigram_config(),
            &TrigramProvider::new(384),
            false,
            &progress,
        )
        .await
        .unwrap();

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&IndexPhase::Load));
        assert!(phases.contains(&IndexPhase::Chunk));
        assert!(phases.contains(&IndexPhase::Embed));
        assert_eq!(phases.last(), Some(&IndexPhase::Index));
    }

    #[tokio::test]
    async fn test_index_manual_persists_config() {
        let ws = TempDir::new().unwrap();
        let provider = TrigramProvider::new(384);
        let options = IndexOptions::default();

        let (_, stats) = index_manual(
            ws.path(),
            &manual(),
            &options,
            &provider,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert_eq!(stats.chunks, 3);

        let saved = config::load_config(ws.path(), COLLECTION_NAME).unwrap();
        assert_eq!(saved.provider, "trigram");
        assert_eq!(saved.model, "trigram-v1");
        assert_eq!(saved.embedding_dim, 384);

        let base = super::stats(ws.path(), COLLECTION_NAME).unwrap();
        assert_eq!(base.chunks_count, 3);
        assert_eq!(base.pages_count, 3);
        assert_eq!(base.fingerprint.as_deref(), Some(stats.fingerprint.as_str()));
        assert!(base.indexed_at.is_some());
        assert!(base.db_size_bytes > 0);

        let (_, again) = index_manual(
            ws.path(),
            &manual(),
            &options,
            &provider,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();
        assert!(again.reused);
    }

    #[tokio::test]
    async fn test_clean_forces_rebuild() {
        let ws = TempDir::new().unwrap();
        let provider = TrigramProvider::new(384);
        let options = IndexOptions::default();

        index_manual(ws.path(), &manual(), &options, &provider, &ProgressReporter::noop())
            .await
            .unwrap();
        clean(ws.path(), COLLECTION_NAME).unwrap();

        let base = super::stats(ws.path(), COLLECTION_NAME).unwrap();
        assert_eq!(base.chunks_count, 0);
        assert!(base.fingerprint.is_none());

        let (_, rebuilt) =
            index_manual(ws.path(), &manual(), &options, &provider, &ProgressReporter::noop())
                .await
                .unwrap();
        assert!(!rebuilt.reused);
    }

    #[test]
    fn test_missing_collection() {
        let ws = TempDir::new().unwrap();
        assert!(super::stats(ws.path(), "nope").is_err());
        assert!(clean(ws.path(), "nope").is_err());
        assert!(open_index(ws.path(), "nope").is_err());
    }
}
