//! Provider identification and defaults.

/// Default OpenAI API base URL.
pub const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default Ollama base URL.
pub const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAI => OPENAI_DEFAULT_ENDPOINT,
            Self::Ollama => OLLAMA_DEFAULT_ENDPOINT,
        }
    }
}
