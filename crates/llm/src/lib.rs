//! LLM integration crate for the Patriot manual assistant.
//!
//! Provider-agnostic chat completions behind the [`LlmClient`] trait.
//!
//! # Providers
//! - **OpenAI**: chat completions API (default, `gpt-4o-mini`)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use patriot_llm::{create_client, LlmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("openai", None, Some("sk-..."))?;
//! let request = LlmRequest::new("How often should I rotate the tires?", "gpt-4o-mini")
//!     .with_temperature(0.1);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
