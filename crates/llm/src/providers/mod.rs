//! Concrete chat-completion providers.

mod ollama;
mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
