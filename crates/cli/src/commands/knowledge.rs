//! Knowledge command handler.
//!
//! Index management and direct retrieval over the manual.

use super::{prepare_retriever, stderr_progress};
use clap::{Args, Subcommand};
use patriot_core::{config::AppConfig, AppResult};
use patriot_knowledge::{
    extract_sections, keyword, load_manual, retriever::preview, ProgressReporter,
    COLLECTION_NAME,
};

/// Manual index management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Build (or reuse) the manual index
    Index(KnowledgeIndexCommand),
    /// Search the manual without asking the LLM
    Search(KnowledgeSearchCommand),
    /// Show how manual lines group into topical sections
    Sections(KnowledgeSectionsCommand),
    /// Show index statistics
    Stats(KnowledgeStatsCommand),
    /// Drop the index so the next run rebuilds it
    Clean(KnowledgeCleanCommand),
}

/// Build the manual index
#[derive(Args, Debug)]
pub struct KnowledgeIndexCommand {
    /// Rebuild even when the manual and settings are unchanged
    #[arg(long)]
    pub reindex: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeIndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge index command (reindex: {})", self.reindex);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            stderr_progress()
        };
        let (_, stats) = prepare_retriever(config, self.reindex, &progress).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else if stats.reused {
            println!(
                "Index is up to date ({} chunks from {} pages)",
                stats.chunks, stats.pages
            );
        } else {
            println!(
                "Indexed {} chunks from {} pages in {:.2}s",
                stats.chunks, stats.pages, stats.duration_secs
            );
        }

        Ok(())
    }
}

/// Search the manual
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Maximum cosine distance for a hit
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Plain substring search instead of semantic search
    #[arg(long)]
    pub keyword: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge search command");

        if self.keyword {
            return self.keyword_search(config);
        }

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let threshold = self.threshold.unwrap_or(config.retrieval.score_threshold);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            stderr_progress()
        };
        let (retriever, _) = prepare_retriever(config, false, &progress).await?;
        let hits = retriever
            .search_with_score(&self.query, top_k, threshold)
            .await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No passages within distance {:.2}", threshold);
        }
        for (i, hit) in hits.iter().enumerate() {
            println!(
                "{}. [page {}, distance {:.3}] {}",
                i + 1,
                hit.page,
                hit.score,
                preview(&hit.content, 160)
            );
        }

        Ok(())
    }

    fn keyword_search(&self, config: &AppConfig) -> AppResult<()> {
        let manual = load_manual(&config.resolved_manual_path())?;
        let hits = keyword::keyword_search(&manual, &self.query);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No lines mention '{}'", self.query);
        }
        for (i, hit) in hits.iter().enumerate() {
            println!("{}.\n{}\n", i + 1, hit);
        }

        Ok(())
    }
}

/// Show manual sections
#[derive(Args, Debug)]
pub struct KnowledgeSectionsCommand {
    /// Output as JSON (full section text)
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSectionsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge sections command");

        let manual = load_manual(&config.resolved_manual_path())?;
        let sections = extract_sections(&manual);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&sections)?);
            return Ok(());
        }

        println!("Manual: {} ({} pages)", manual.path.display(), manual.page_count());
        for (section, body) in &sections {
            println!(
                "  {:<18} {:>6} lines {:>8} chars",
                section.as_str(),
                body.lines().count(),
                body.chars().count()
            );
        }

        Ok(())
    }
}

/// Show index stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command");

        let stats = patriot_knowledge::stats(&config.workspace, COLLECTION_NAME)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Collection: {}", stats.collection);
            println!("  Pages: {}", stats.pages_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            println!(
                "  Embeddings: {} ({})",
                stats.embedding_provider, stats.embedding_model
            );
            if let Some(indexed_at) = stats.indexed_at {
                println!("  Indexed at: {}", indexed_at);
            }
        }

        Ok(())
    }
}

/// Clean the index
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {}

impl KnowledgeCleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge clean command");

        patriot_knowledge::clean(&config.workspace, COLLECTION_NAME)?;
        println!("Collection '{}' cleaned", COLLECTION_NAME);

        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Index(cmd) => cmd.execute(config).await,
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Sections(cmd) => cmd.execute(config),
            KnowledgeAction::Stats(cmd) => cmd.execute(config),
            KnowledgeAction::Clean(cmd) => cmd.execute(config),
        }
    }
}
