//! Interactive diagnostic session.

use super::{build_agent, render_diagnosis, stderr_progress};
use clap::Args;
use patriot_core::{config::AppConfig, AppError, AppResult};
use patriot_knowledge::DiagnosticAgent;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

const PROMPT: &str = "Describe your Patriot issue: ";

const FAREWELL: &str = "Thank you for using the Jeep Patriot Diagnostic Assistant!";

const BANNER_WIDTH: usize = 60;

/// Interactive diagnostic session
#[derive(Args, Debug, Default)]
pub struct ChatCommand {}

/// What one line of user input asks for.
#[derive(Debug, PartialEq, Eq)]
enum SessionInput<'a> {
    Quit,
    Skip,
    Query(&'a str),
}

fn classify(line: &str) -> SessionInput<'_> {
    let input = line.trim();
    if input.is_empty() {
        return SessionInput::Skip;
    }
    match input.to_lowercase().as_str() {
        "quit" | "exit" | "q" => SessionInput::Quit,
        _ => SessionInput::Query(input),
    }
}

fn banner() -> String {
    let rule = "=".repeat(BANNER_WIDTH);
    format!(
        "\n{rule}\nJEEP PATRIOT DIAGNOSTIC ASSISTANT\n{rule}\n\
         Ask me about any issues with your 2011 Jeep Patriot.\n\
         I'll consult the official manual to help diagnose problems.\n\
         Type 'quit' or 'exit' to end the session.\n{rule}\n"
    )
}

/// Startup failures shown as plain `Error: ...` lines.
fn startup_error(err: &AppError) -> String {
    match err {
        AppError::Config(msg) | AppError::Manual(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting interactive session");

        if let Err(e) = config.validate() {
            println!("Error: {}", startup_error(&e));
            return Ok(());
        }

        let manual_path = config.resolved_manual_path();
        if !manual_path.exists() {
            println!("Error: Manual PDF not found at {}", manual_path.display());
            return Ok(());
        }

        println!("Initializing Jeep Patriot Diagnostic Assistant...");
        println!("Loading manual content...");

        let mut agent = match build_agent(config, &stderr_progress()).await {
            Ok(agent) => agent,
            Err(e) => {
                println!("Error initializing assistant: {}", e);
                return Ok(());
            }
        };

        println!("Assistant ready!");
        println!("{}", banner());

        let stdin = BufReader::new(tokio::io::stdin());
        run_session(&mut agent, stdin, &mut std::io::stdout()).await?;

        tracing::info!(
            "Session ended after {} history entries",
            agent.history().len()
        );
        Ok(())
    }
}

/// Answer queries read from `input` until a quit word or EOF.
async fn run_session<R, W>(agent: &mut DiagnosticAgent, input: R, out: &mut W) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            writeln!(out, "{}", FAREWELL)?;
            return Ok(());
        };

        let query = match classify(&line) {
            SessionInput::Quit => {
                writeln!(out, "{}", FAREWELL)?;
                return Ok(());
            }
            SessionInput::Skip => continue,
            SessionInput::Query(query) => query,
        };

        writeln!(out, "\nAnalyzing issue and consulting manual...")?;

        match agent.diagnose(query).await {
            Ok(diagnosis) => writeln!(out, "\n{}", render_diagnosis(&diagnosis))?,
            Err(e) => {
                tracing::error!("Diagnosis failed: {}", e);
                writeln!(out, "Error during diagnosis: {}", e)?;
                writeln!(out, "Please try rephrasing your question.\n")?;
            }
        }
    }
}
