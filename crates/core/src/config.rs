//! Configuration management for the Patriot manual assistant.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.patriot/config.yaml` or `PATRIOT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! All persistent state (index, prompt overrides) lives under `.patriot/`
//! in the workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default manual file name, resolved against the workspace.
pub const DEFAULT_MANUAL_PATH: &str = "2011-patriot manual.pdf";

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Chat providers the assistant can talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Embedding providers the indexer can use.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Chat model used for a provider that has no `model` configured.
pub fn default_chat_model(provider: &str) -> &'static str {
    match provider {
        "ollama" => "llama3.2",
        _ => "gpt-4o-mini",
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .patriot/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Path to the manual PDF (relative paths are resolved against the workspace)
    pub manual_path: PathBuf,

    /// Chat provider ("openai" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Sampling temperature for chat completions
    pub temperature: f32,

    /// Embedding provider ("openai", "ollama" or "trigram")
    pub embedding_provider: String,

    /// Explicit API key (takes precedence over provider env vars)
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Retrieval tuning
    pub retrieval: RetrievalConfig,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,
}

/// Retrieval settings used by the diagnostic pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of nearest chunks returned by semantic search
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Maximum cosine distance accepted by scored search
    #[serde(rename = "scoreThreshold", default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Upper bound on manual sections handed to the LLM
    #[serde(rename = "maxSections", default = "default_max_sections")]
    pub max_sections: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_score_threshold() -> f32 {
    0.7
}

fn default_max_sections() -> usize {
    15
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            max_sections: default_max_sections(),
        }
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
///
/// The block's key in `llm.providers` names the provider; every field is
/// optional and falls back to that provider's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Chat model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Embedding model
    #[serde(
        rename = "embeddingModel",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub embedding_model: Option<String>,

    /// Base URL of the provider API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    manual: Option<ManualSection>,
    llm: Option<LlmConfig>,
    retrieval: Option<RetrievalConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManualSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            manual_path: PathBuf::from(DEFAULT_MANUAL_PATH),
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            embedding_provider: "openai".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            retrieval: RetrievalConfig::default(),
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default locations and the environment.
    ///
    /// Environment variables:
    /// - `PATRIOT_WORKSPACE`: Override workspace path
    /// - `PATRIOT_CONFIG`: Path to config file
    /// - `PATRIOT_MANUAL`: Path to the manual PDF
    /// - `PATRIOT_PROVIDER`: Chat provider
    /// - `PATRIOT_MODEL`: Chat model
    /// - `PATRIOT_EMBEDDING_PROVIDER`: Embedding provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use patriot_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Manual: {:?}", config.resolved_manual_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, letting the caller pin the workspace and config file
    /// before the YAML file is located.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("PATRIOT_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("PATRIOT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.patriot_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(manual) = env_path("PATRIOT_MANUAL") {
            config.manual_path = manual;
        }

        if let Ok(provider) = std::env::var("PATRIOT_PROVIDER") {
            config.switch_provider(provider);
        }

        if let Ok(model) = std::env::var("PATRIOT_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("PATRIOT_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(manual) = config_file.manual {
            if let Some(path) = manual.path {
                result.manual_path = PathBuf::from(path);
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            result.embedding_provider = llm.active_embedding_provider.clone();

            result.llm = Some(llm);
            result.model = result.chat_model_for(&result.provider);
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over the environment and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        manual: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        embedding_provider: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(manual) = manual {
            self.manual_path = manual;
        }

        if let Some(provider) = provider {
            self.switch_provider(provider);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(embedding_provider) = embedding_provider {
            self.embedding_provider = embedding_provider;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Change the chat provider. A different provider also takes that
    /// provider's model; an explicit model is applied afterwards by callers.
    fn switch_provider(&mut self, provider: String) {
        if provider != self.provider {
            self.model = self.chat_model_for(&provider);
            self.provider = provider;
        }
    }

    /// Chat model for a provider: its config block, else the built-in default.
    pub fn chat_model_for(&self, provider: &str) -> String {
        self.get_provider_config(provider)
            .and_then(|pc| pc.model)
            .unwrap_or_else(|| default_chat_model(provider).to_string())
    }

    /// Get the path to the .patriot directory.
    pub fn patriot_dir(&self) -> PathBuf {
        self.workspace.join(".patriot")
    }

    /// Manual path resolved against the workspace.
    pub fn resolved_manual_path(&self) -> PathBuf {
        if self.manual_path.is_absolute() {
            self.manual_path.clone()
        } else {
            self.workspace.join(&self.manual_path)
        }
    }

    /// Get a provider's configuration block.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Custom endpoint for a provider, if configured.
    pub fn endpoint_for(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider).and_then(|pc| pc.endpoint)
    }

    /// Embedding model for the active embedding provider.
    pub fn embedding_model(&self) -> String {
        if let Some(model) = self
            .get_provider_config(&self.embedding_provider)
            .and_then(|pc| pc.embedding_model)
        {
            return model;
        }

        match self.embedding_provider.as_str() {
            "openai" => "text-embedding-ada-002".to_string(),
            "ollama" => "nomic-embed-text".to_string(),
            _ => "trigram-v1".to_string(),
        }
    }

    /// Environment variable holding a provider's API key.
    ///
    /// The block's `apiKeyEnv` wins; OpenAI falls back to `OPENAI_API_KEY`.
    pub fn api_key_env(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.api_key_env)
            .or_else(|| (provider == "openai").then(|| OPENAI_API_KEY_ENV.to_string()))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit key, then the variable named by [`Self::api_key_env`].
    /// Empty values count as missing.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = self.api_key_env(provider)?;
        std::env::var(&env_var).ok().filter(|key| !key.trim().is_empty())
    }

    /// Validate the configuration before any network or file work starts.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let needs_openai = self.provider == "openai" || self.embedding_provider == "openai";
        if needs_openai && self.resolve_api_key("openai").is_none() {
            let env_var = self
                .api_key_env("openai")
                .unwrap_or_else(|| OPENAI_API_KEY_ENV.to_string());
            return Err(AppError::Config(format!(
                "{env_var} not found in environment variables. \
                 Create a .env file with {env_var}=your_api_key_here"
            )));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
