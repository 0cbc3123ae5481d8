//! Jeep Patriot diagnostic assistant CLI.
//!
//! Answers questions about a 2011 Jeep Patriot using only the owner's manual.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, KnowledgeCommand, PromptsCommand};
use patriot_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Jeep Patriot diagnostic assistant grounded in the owner's manual
#[derive(Parser, Debug)]
#[command(name = "patriot")]
#[command(about = "Diagnose 2011 Jeep Patriot issues from the owner's manual", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "PATRIOT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "PATRIOT_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the manual PDF
    #[arg(long, global = true, env = "PATRIOT_MANUAL")]
    manual: Option<PathBuf>,

    /// Chat provider (openai, ollama)
    #[arg(short, long, global = true, env = "PATRIOT_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "PATRIOT_MODEL")]
    model: Option<String>,

    /// Embedding provider (openai, ollama, trigram)
    #[arg(short, long, global = true, env = "PATRIOT_EMBEDDING_PROVIDER")]
    embedding_provider: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive diagnostic session (default)
    Chat(ChatCommand),

    /// One-shot diagnosis of a single question
    Ask(AskCommand),

    /// Manual index management
    Knowledge(KnowledgeCommand),

    /// List built-in prompts and workspace overrides
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // .env must be loaded before clap reads env-backed flags
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace.clone(), cli.config)?;
    let config = config.with_overrides(
        cli.workspace,
        cli.manual,
        cli.provider,
        cli.model,
        cli.embedding_provider,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Patriot assistant starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Manual: {:?}", config.resolved_manual_path());
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!("Embedding provider: {}", config.embedding_provider);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Chat(ChatCommand::default()));

    let command_name = match &command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Knowledge(_) => "knowledge",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
