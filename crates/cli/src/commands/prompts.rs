//! Prompt listing.

use clap::Args;
use patriot_core::{config::AppConfig, AppResult};
use patriot_prompt::{list_prompts, load_prompt, PromptListing};
use std::path::Path;

/// List built-in prompts and workspace overrides
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let listings = list_prompts(&config.workspace)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listings)?);
            return Ok(());
        }

        for listing in &listings {
            println!("{}", describe(&config.workspace, listing));
        }

        Ok(())
    }
}

/// One line per prompt: id, where it comes from, and whether it loads.
fn describe(workspace: &Path, listing: &PromptListing) -> String {
    let source = match (&listing.override_path, listing.builtin) {
        (Some(path), true) => format!("override of built-in ({})", path.display()),
        (Some(path), false) => format!("workspace ({})", path.display()),
        (None, _) => "built-in".to_string(),
    };

    match load_prompt(workspace, &listing.id) {
        Ok(def) => format!("{:<20} {} - {}", listing.id, source, def.title),
        Err(e) => format!("{:<20} {} - invalid: {}", listing.id, source, e),
    }
}
