//! One-shot diagnosis.

use super::{build_agent, render_diagnosis, stderr_progress};
use clap::Args;
use patriot_core::{config::AppConfig, AppResult};
use patriot_knowledge::retriever::preview;
use patriot_knowledge::ProgressReporter;

/// Diagnose a single question and exit
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question about your Patriot
    pub question: String,

    /// Show the manual passages the answer was based on
    #[arg(long)]
    pub sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        // keep stdout clean for machine-readable output
        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            stderr_progress()
        };

        let mut agent = build_agent(config, &progress).await?;
        let diagnosis = agent.diagnose(&self.question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&diagnosis)?);
            return Ok(());
        }

        println!("{}", render_diagnosis(&diagnosis));

        if self.sources {
            println!("Manual passages:");
            if diagnosis.sections.is_empty() {
                println!("  (none)");
            }
            for (i, section) in diagnosis.sections.iter().enumerate() {
                println!("{}. {}", i + 1, passage_line(section));
            }
        }

        Ok(())
    }
}

/// One-line preview of a passage that keeps its page reference.
fn passage_line(section: &str) -> String {
    match section.rsplit_once(" (Page ") {
        Some((body, page)) => format!("{} (Page {}", preview(body, 160), page),
        None => preview(section, 160),
    }
}
