//! Prompt loader for built-in and workspace prompt definitions.

use crate::defaults::{builtin_ids, builtin_prompt};
use crate::types::{PromptDefinition, PromptListing};
use patriot_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory holding prompt overrides.
fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".patriot/prompts")
}

/// Load a prompt definition by ID.
///
/// A `<id>.yml` file in `.patriot/prompts/` overrides the built-in prompt of
/// the same id. An override that fails to parse or validate is an error; it
/// never silently falls back to the built-in.
///
/// # Example
/// ```no_run
/// use patriot_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "diagnose.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        return builtin_prompt(prompt_id).ok_or_else(|| {
            AppError::Prompt(format!(
                "Prompt '{}' not found (no built-in and no {:?})",
                prompt_id, prompt_file
            ))
        });
    }

    tracing::debug!("Loading prompt override from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List every prompt id: built-ins plus `.yml` files in `.patriot/prompts/`.
///
/// Sorted by id. Override files are listed without being parsed.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut listings: BTreeMap<String, PromptListing> = builtin_ids()
        .iter()
        .map(|id| {
            (
                id.to_string(),
                PromptListing {
                    id: id.to_string(),
                    builtin: true,
                    override_path: None,
                },
            )
        })
        .collect();

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                AppError::Prompt(format!("Failed to read prompt directory {:?}: {}", dir, e))
            })?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("yml")
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            listings
                .entry(stem.to_string())
                .or_insert_with(|| PromptListing {
                    id: stem.to_string(),
                    builtin: false,
                    override_path: None,
                })
                .override_path = Some(path.to_path_buf());
        }
    }

    Ok(listings.into_values().collect())
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
