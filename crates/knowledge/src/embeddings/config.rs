//! Embedding configuration.

use serde::{Deserialize, Serialize};

/// Embedding settings resolved for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Custom API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_batch_size() -> usize {
    100
}

/// Default model for an embedding provider.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "text-embedding-ada-002",
        "ollama" => "nomic-embed-text",
        _ => "trigram-v1",
    }
}

/// Vector size produced by a provider/model pair.
pub fn default_dimensions(provider: &str, model: &str) -> usize {
    match (provider, model) {
        ("openai", "text-embedding-3-large") => 3072,
        ("openai", _) => 1536,
        ("ollama", "mxbai-embed-large") => 1024,
        ("ollama", "all-minilm") => 384,
        ("ollama", _) => 768,
        _ => 384,
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::for_provider("openai", None)
    }
}

impl EmbeddingConfig {
    /// Settings for a provider, using its default model when none is given.
    pub fn for_provider(provider: &str, model: Option<&str>) -> Self {
        let model = model.unwrap_or_else(|| default_model(provider)).to_string();
        Self {
            dimensions: default_dimensions(provider, &model),
            provider: provider.to_string(),
            model,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }

    /// Set a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-ada-002");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_provider_defaults() {
        let ollama = EmbeddingConfig::for_provider("ollama", None);
        assert_eq!(ollama.model, "nomic-embed-text");
        assert_eq!(ollama.dimensions, 768);

        let trigram = EmbeddingConfig::for_provider("trigram", None);
        assert_eq!(trigram.model, "trigram-v1");
        assert_eq!(trigram.dimensions, 384);

        let large = EmbeddingConfig::for_provider("openai", Some("text-embedding-3-large"));
        assert_eq!(large.dimensions, 3072);
    }
}
