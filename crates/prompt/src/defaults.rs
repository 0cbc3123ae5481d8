//! Built-in prompt definitions.
//!
//! Used whenever the workspace has no `.patriot/prompts/<id>.yml` override.

use crate::types::{PromptDefinition, PromptOutputSpec};

/// Query analysis prompt id.
pub const ANALYZE_PROMPT_ID: &str = "diagnose.analyze";

/// Manual-grounded answer prompt id.
pub const ANSWER_PROMPT_ID: &str = "diagnose.answer";

const ANALYZE_SYSTEM: &str =
    "You are an expert automotive diagnostic assistant specializing in Jeep Patriots.";

const ANALYZE_TEMPLATE: &str = r#"Analyze this Jeep Patriot related query: "{{query}}"

Identify:
1. The main system involved (engine, transmission, electrical, brakes, etc.)
2. Symptoms described
3. Potential diagnostic areas to focus on

Respond with a brief analysis in JSON format:
{
    "system": "primary system name",
    "symptoms": ["symptom1", "symptom2"],
    "focus_areas": ["area1", "area2"]
}"#;

const ANSWER_SYSTEM: &str = "You are a Jeep Patriot manual assistant.
ONLY use the provided manual content in your response.
Do not add general automotive knowledge or advice not found in the manual.
If the manual doesn't contain enough information, say so clearly.";

const ANSWER_TEMPLATE: &str = r#"Based ONLY on the Jeep Patriot manual content below, provide a diagnostic response for this query:

USER QUERY: {{query}}

RELEVANT MANUAL CONTENT:
{{manualContext}}

IMPORTANT: Only use information from the manual content provided above. Do not add general automotive knowledge.

Provide a response that includes:
1. What the manual says about this issue
2. Manual-specified diagnostic steps
3. Manual-recommended solutions
4. Any safety warnings from the manual

If the manual content doesn't fully address the query, state that clearly."#;

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    let (title, system, template, format) = match id {
        ANALYZE_PROMPT_ID => ("Query analysis", ANALYZE_SYSTEM, ANALYZE_TEMPLATE, "json"),
        ANSWER_PROMPT_ID => (
            "Manual-grounded diagnosis",
            ANSWER_SYSTEM,
            ANSWER_TEMPLATE,
            "markdown",
        ),
        _ => return None,
    };

    Some(PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        created_by: "builtin".to_string(),
        system: Some(system.to_string()),
        template: template.to_string(),
        output: PromptOutputSpec {
            format: format.to_string(),
        },
    })
}

/// Ids of every built-in prompt.
pub fn builtin_ids() -> [&'static str; 2] {
    [ANALYZE_PROMPT_ID, ANSWER_PROMPT_ID]
}
