//! Command handlers for the Patriot CLI.
//!
//! Shared setup (manual loading, index, agent construction) lives here so
//! every command reaches the manual the same way.

pub mod ask;
pub mod chat;
pub mod knowledge;
pub mod prompts;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use knowledge::KnowledgeCommand;
pub use prompts::PromptsCommand;

use patriot_core::{config::AppConfig, AppResult};
use patriot_knowledge::{
    create_provider, index_manual, load_manual, AgentSettings, DiagnosticAgent, Diagnosis,
    EmbeddingConfig, EmbeddingProvider, IndexOptions, IndexStats, ManualRetriever, ProgressEvent,
    ProgressReporter,
};
use patriot_llm::create_client;
use std::sync::Arc;

/// Separator around a diagnostic response.
pub const RESPONSE_RULE_WIDTH: usize = 40;

/// Embedding provider for the configured embedding backend.
pub fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let embedding = EmbeddingConfig::for_provider(
        &config.embedding_provider,
        Some(&config.embedding_model()),
    )
    .with_endpoint(config.endpoint_for(&config.embedding_provider));

    let api_key = config.resolve_api_key(&config.embedding_provider);
    create_provider(&embedding, api_key.as_deref())
}

/// Load the manual and build or reuse its index.
pub async fn prepare_retriever(
    config: &AppConfig,
    reindex: bool,
    progress: &ProgressReporter,
) -> AppResult<(ManualRetriever, IndexStats)> {
    let manual = load_manual(&config.resolved_manual_path())?;
    let provider = embedding_provider(config)?;

    let options = IndexOptions {
        reindex,
        ..Default::default()
    };
    let (index, stats) = index_manual(
        &config.workspace,
        &manual,
        &options,
        provider.as_ref(),
        progress,
    )
    .await?;

    Ok((ManualRetriever::new(manual, Box::new(index), provider), stats))
}

/// Build the diagnostic agent over the indexed manual.
pub async fn build_agent(
    config: &AppConfig,
    progress: &ProgressReporter,
) -> AppResult<DiagnosticAgent> {
    let (retriever, stats) = prepare_retriever(config, false, progress).await?;
    tracing::debug!(
        "Index ready: {} chunks (reused: {})",
        stats.chunks,
        stats.reused
    );

    let endpoint = config.endpoint_for(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())?;

    DiagnosticAgent::new(
        retriever,
        llm,
        AgentSettings::from_config(config),
        &config.workspace,
    )
}

/// Progress reporter that writes one line per event to stderr.
pub fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| eprintln!("{}", event)))
}

/// Human-readable rendering of a diagnosis.
pub fn render_diagnosis(diagnosis: &Diagnosis) -> String {
    let rule = "-".repeat(RESPONSE_RULE_WIDTH);
    format!(
        "DIAGNOSTIC RESPONSE:\n{rule}\n{}\n{rule}\n",
        diagnosis.answer
    )
}
