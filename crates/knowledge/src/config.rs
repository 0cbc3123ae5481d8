//! Knowledge collection configuration and on-disk layout.

use crate::types::KnowledgeBaseConfig;
use patriot_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load collection configuration.
///
/// Loads from `.patriot/knowledge/<collection>/config.yaml` if it exists,
/// otherwise returns the defaults for the named collection.
pub fn load_config(workspace: &Path, collection: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, collection);

    if !config_path.exists() {
        tracing::debug!(
            "Using default config for collection '{}' (no config file found)",
            collection
        );
        return Ok(KnowledgeBaseConfig {
            name: collection.to_string(),
            ..Default::default()
        });
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.name = collection.to_string();

    tracing::debug!("Loaded config for collection '{}'", collection);
    Ok(config)
}

/// Save collection configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved config for collection '{}'", config.name);
    Ok(())
}

/// Get the directory for a collection.
pub fn get_base_dir(workspace: &Path, collection: &str) -> PathBuf {
    workspace
        .join(".patriot")
        .join("knowledge")
        .join(collection)
}

/// Get the path to a collection's config file.
pub fn get_config_path(workspace: &Path, collection: &str) -> PathBuf {
    get_base_dir(workspace, collection).join("config.yaml")
}

/// Get the SQLite index path for a collection.
pub fn get_index_path(workspace: &Path, collection: &str) -> PathBuf {
    get_base_dir(workspace, collection).join("index.sqlite")
}
