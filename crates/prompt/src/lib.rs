//! Prompt system for the Patriot manual assistant.
//!
//! Built-in diagnostic prompts, optional YAML overrides under
//! `.patriot/prompts/`, and Handlebars rendering.

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use defaults::{builtin_prompt, ANALYZE_PROMPT_ID, ANSWER_PROMPT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptListing, PromptOutputSpec,
};
