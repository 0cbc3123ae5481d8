//! Diagnostic agent: a fixed five-step pipeline per query.
//!
//! `read_manual -> analyze_query -> search_manual -> generate_diagnosis -> format_response`

use crate::rag::types::{
    no_information_text, Diagnosis, DiagnosticState, HistoryEntry, HistoryKind, QueryAnalysis,
    DIAGNOSIS_ERROR_TEXT,
};
use crate::retriever::{ManualRetriever, DEFAULT_TOP_K};
use crate::sections::{extract_sections, Section};
use patriot_core::{AppConfig, AppError, AppResult};
use patriot_llm::{LlmClient, LlmRequest};
use patriot_prompt::{
    build_prompt, load_prompt, BuiltPrompt, PromptDefinition, ANALYZE_PROMPT_ID, ANSWER_PROMPT_ID,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Query words that pull in extra keyword hits from the manual.
pub const AUTOMOTIVE_TERMS: [&str; 5] = [
    "diagnostic",
    "troubleshoot",
    "symptom",
    "repair",
    "maintenance",
];

/// Keyword hits added per automotive term found in the query.
const HITS_PER_TERM: usize = 3;

/// Model and retrieval settings for the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub top_k: usize,
    pub max_sections: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            top_k: DEFAULT_TOP_K,
            max_sections: 15,
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            top_k: config.retrieval.top_k,
            max_sections: config.retrieval.max_sections,
        }
    }
}

/// Answers questions about the vehicle from the manual only.
pub struct DiagnosticAgent {
    retriever: ManualRetriever,
    llm: Arc<dyn LlmClient>,
    settings: AgentSettings,
    analyze_prompt: PromptDefinition,
    answer_prompt: PromptDefinition,
    sections: Option<BTreeMap<Section, String>>,
    history: Vec<HistoryEntry>,
}

impl DiagnosticAgent {
    /// Create an agent, loading prompt overrides from the workspace.
    pub fn new(
        retriever: ManualRetriever,
        llm: Arc<dyn LlmClient>,
        settings: AgentSettings,
        workspace: &Path,
    ) -> AppResult<Self> {
        let analyze_prompt = load_prompt(workspace, ANALYZE_PROMPT_ID)?;
        let answer_prompt = load_prompt(workspace, ANSWER_PROMPT_ID)?;

        Ok(Self {
            retriever,
            llm,
            settings,
            analyze_prompt,
            answer_prompt,
            sections: None,
            history: Vec::new(),
        })
    }

    /// Session history across every query so far.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Run the pipeline for one query.
    pub async fn diagnose(&mut self, query: &str) -> AppResult<Diagnosis> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Other("Query cannot be empty".to_string()));
        }

        tracing::info!("Diagnosing: {}", query);

        let mut state = DiagnosticState::new(query);
        self.read_manual(&mut state);
        self.analyze_query(&mut state).await?;
        self.search_manual(&mut state).await;
        self.generate_diagnosis(&mut state).await?;
        self.format_response(&mut state);

        self.history
            .extend(state.conversation_history.iter().cloned());

        Ok(state.into())
    }

    fn read_manual(&mut self, state: &mut DiagnosticState) {
        tracing::info!("Reading Jeep Patriot manual...");

        let manual = self.retriever.manual();
        let sections = self
            .sections
            .get_or_insert_with(|| extract_sections(manual));

        let populated = sections.values().filter(|body| !body.is_empty()).count();
        if populated == 0 {
            tracing::warn!("No manual sections found in {:?}", manual.path);
        }

        state.manual_sections = sections.clone();
        tracing::info!(
            "Loaded manual with {} sections ({} populated)",
            state.manual_sections.len(),
            populated
        );
    }

    async fn analyze_query(&self, state: &mut DiagnosticState) -> AppResult<()> {
        tracing::info!("Analyzing user query...");

        let prompt = build_prompt(&self.analyze_prompt, query_vars(&state.user_query))?;

        match self.llm.complete(&self.request(prompt)).await {
            Ok(response) => {
                state.analysis = QueryAnalysis::parse_lenient(&response.content);
                if state.analysis.is_none() {
                    tracing::debug!("Query analysis was not valid JSON");
                }
                state
                    .conversation_history
                    .push(HistoryEntry::new(HistoryKind::Analysis, response.content));
            }
            Err(e) => tracing::error!("Error analyzing query: {}", e),
        }

        Ok(())
    }

    async fn search_manual(&self, state: &mut DiagnosticState) {
        tracing::info!("Searching manual for relevant information...");

        let query = &state.user_query;
        let mut results = self
            .retriever
            .semantic_search(query, self.settings.top_k)
            .await;

        if results.is_empty() {
            tracing::warn!("Semantic search returned nothing, falling back to keyword search");
            results = self.retriever.keyword_search(query);
        }

        let lower = query.to_lowercase();
        for term in AUTOMOTIVE_TERMS {
            if lower.contains(term) {
                let extra = self.retriever.keyword_search(term);
                results.extend(extra.into_iter().take(HITS_PER_TERM));
            }
        }

        results.truncate(self.settings.max_sections);
        tracing::info!("Found {} relevant manual sections", results.len());
        state.relevant_sections = results;
    }

    async fn generate_diagnosis(&self, state: &mut DiagnosticState) -> AppResult<()> {
        tracing::info!("Generating diagnosis...");

        if state.relevant_sections.is_empty() {
            state.diagnosis = no_information_text(&state.user_query);
            return Ok(());
        }

        let mut vars = query_vars(&state.user_query);
        vars.insert(
            "manualContext".to_string(),
            state.relevant_sections.join("\n\n"),
        );
        let prompt = build_prompt(&self.answer_prompt, vars)?;

        state.diagnosis = match self.llm.complete(&self.request(prompt)).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::error!("Error generating diagnosis: {}", e);
                DIAGNOSIS_ERROR_TEXT.to_string()
            }
        };

        Ok(())
    }

    fn format_response(&self, state: &mut DiagnosticState) {
        tracing::info!("Formatting response...");

        state.diagnosis = state.diagnosis.trim().to_string();
        state.recommendations = extract_recommendations(&state.diagnosis);
        state
            .conversation_history
            .push(HistoryEntry::new(HistoryKind::Diagnosis, state.diagnosis.clone()));
    }

    fn request(&self, prompt: BuiltPrompt) -> LlmRequest {
        let request = LlmRequest::new(prompt.user, self.settings.model.clone())
            .with_temperature(self.settings.temperature);
        match prompt.system {
            Some(system) => request.with_system(system),
            None => request,
        }
    }
}

fn query_vars(query: &str) -> HashMap<String, String> {
    HashMap::from([("query".to_string(), query.to_string())])
}

/// Numbered or bulleted lines of an answer, markers removed.
pub fn extract_recommendations(answer: &str) -> Vec<String> {
    answer
        .lines()
        .filter_map(strip_list_marker)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> Option<&str> {
    let line = line.trim_start();

    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest);
        }
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let rest = &line[digits..];
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::embeddings::EmbeddingProvider;
    use crate::index::SqliteIndex;
    use crate::parser::Manual;
    use crate::progress::ProgressReporter;
    use crate::types::KnowledgeBaseConfig;
    use patriot_llm::LlmResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// LLM stand-in that replays canned replies and records requests.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<AppResult<String>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<AppResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<patriot_llm::LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Llm("no scripted reply".to_string())));
            reply.map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: Default::default(),
            })
        }
    }

    const PAGES: [&str; 4] = [
        "ENGINE OVERHEATING\nIf the engine coolant temperature warning light turns on, pull over and stop the vehicle.\nCheck the coolant level in the coolant recovery bottle.",
        "BRAKE SYSTEM\nA grinding noise when braking may indicate worn brake pads.\nHave the brake pads inspected by an authorized dealer.",
        "MAINTENANCE SCHEDULE\nChange engine oil every 6,000 miles.\nRotate tires at every oil change.\nMaintenance records should be kept.",
        "SEATS\nAdjust the headrest by pressing the release button.",
    ];

    async fn agent_with(
        pages: &[&str],
        llm: Arc<ScriptedLlm>,
        workspace: &Path,
    ) -> DiagnosticAgent {
        let manual = Manual::from_pages(
            "2011-patriot manual.pdf",
            pages.iter().map(|p| p.to_string()).collect(),
        );
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(384));
        let config = KnowledgeBaseConfig {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            embedding_dim: 384,
            ..Default::default()
        };

        let mut index = SqliteIndex::in_memory().unwrap();
        crate::build_index(
            &mut index,
            &manual,
            &config,
            provider.as_ref(),
            false,
            &ProgressReporter::noop(),
        )
        .await
        .unwrap();

        let retriever = ManualRetriever::new(manual, Box::new(index), provider);
        DiagnosticAgent::new(retriever, llm, AgentSettings::default(), workspace).unwrap()
    }

    const ANALYSIS_REPLY: &str = r#"{"system": "engine", "symptoms": ["overheating"], "focus_areas": ["coolant"]}"#;

    #[tokio::test]
    async fn test_full_pipeline() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("  The manual says to stop the vehicle.\n\n1. Pull over safely\n2. Check the coolant level\n- Do not open a hot radiator cap\n".to_string()),
        ]);
        let mut agent = agent_with(&PAGES, llm.clone(), ws.path()).await;

        let diagnosis = agent
            .diagnose("My engine is overheating and the coolant light is on")
            .await
            .unwrap();

        assert!(diagnosis.answer.starts_with("The manual says"));
        assert_eq!(
            diagnosis.recommendations,
            vec![
                "Pull over safely",
                "Check the coolant level",
                "Do not open a hot radiator cap"
            ]
        );
        assert_eq!(diagnosis.analysis.unwrap().system, "engine");
        assert!(!diagnosis.sections.is_empty());
        assert!(diagnosis.sections.len() <= 5);
        assert!(diagnosis.sections[0].contains("coolant"));
        assert!(diagnosis.sections[0].ends_with("(Page 1)"));

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].temperature, Some(0.1));
        assert!(requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("specializing in Jeep Patriots"));
        assert!(requests[1].prompt.contains("USER QUERY: My engine is overheating"));
        assert!(requests[1].prompt.contains("(Page 1)"));
        assert!(requests[1].system.as_deref().unwrap().contains("ONLY use"));

        let kinds: Vec<HistoryKind> = agent.history().iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![HistoryKind::Analysis, HistoryKind::Diagnosis]);
    }

    #[tokio::test]
    async fn test_llm_failures_are_absorbed() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![
            Err(AppError::Llm("connection refused".to_string())),
            Err(AppError::Llm("connection refused".to_string())),
        ]);
        let mut agent = agent_with(&PAGES, llm, ws.path()).await;

        let diagnosis = agent.diagnose("brake grinding noise").await.unwrap();

        assert_eq!(diagnosis.answer, DIAGNOSIS_ERROR_TEXT);
        assert!(diagnosis.analysis.is_none());
        assert_eq!(agent.history().len(), 1);
        assert_eq!(agent.history()[0].kind, HistoryKind::Diagnosis);
    }

    #[tokio::test]
    async fn test_no_sections_uses_guidance_text() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![Ok(ANALYSIS_REPLY.to_string())]);
        let mut agent = agent_with(&[], llm.clone(), ws.path()).await;

        let diagnosis = agent.diagnose("flux capacitor").await.unwrap();

        assert!(diagnosis.sections.is_empty());
        assert_eq!(diagnosis.answer, no_information_text("flux capacitor").trim());
        assert_eq!(llm.requests().len(), 1);
    }

    /// Embedder whose queries always fail, as when the embedding service is down.
    #[derive(Debug)]
    struct UnreachableEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for UnreachableEmbedder {
        fn provider_name(&self) -> &str {
            "unreachable"
        }

        fn model_name(&self) -> &str {
            "none"
        }

        fn dimensions(&self) -> usize {
            384
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Knowledge("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_empty_semantic_search_falls_back_to_keywords() {
        let ws = TempDir::new().unwrap();
        let manual = Manual::from_pages(
            "2011-patriot manual.pdf",
            PAGES.iter().map(|p| p.to_string()).collect(),
        );
        let retriever = ManualRetriever::new(
            manual,
            Box::new(SqliteIndex::in_memory().unwrap()),
            Arc::new(UnreachableEmbedder),
        );
        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("Have the brake pads inspected.".to_string()),
        ]);
        let mut agent =
            DiagnosticAgent::new(retriever, llm.clone(), AgentSettings::default(), ws.path())
                .unwrap();

        let diagnosis = agent.diagnose("grinding noise when braking").await.unwrap();

        assert_eq!(diagnosis.sections.len(), 1);
        let window = &diagnosis.sections[0];
        assert!(window.contains("BRAKE SYSTEM"));
        assert!(window.contains("A grinding noise when braking may indicate worn brake pads."));
        assert!(window.contains("Have the brake pads inspected by an authorized dealer."));
        assert!(!window.contains("(Page"));

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].prompt.contains(window.as_str()));
        assert_eq!(diagnosis.answer, "Have the brake pads inspected.");
    }

    #[tokio::test]
    async fn test_automotive_terms_add_keyword_hits() {
        let ws = TempDir::new().unwrap();
        let mut pages: Vec<String> = PAGES.iter().map(|p| p.to_string()).collect();
        pages.push(vec!["Scheduled maintenance item"; 8].join("\n"));
        let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();

        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("Follow the schedule.".to_string()),
        ]);
        let mut agent = agent_with(&page_refs, llm, ws.path()).await;

        let diagnosis = agent
            .diagnose("What maintenance does the oil need?")
            .await
            .unwrap();

        // five semantic hits plus three keyword windows for "maintenance"
        assert_eq!(diagnosis.sections.len(), 8);
        assert!(diagnosis.sections[5..]
            .iter()
            .all(|s| s.to_lowercase().contains("maintenance")));
    }

    #[tokio::test]
    async fn test_sections_capped() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("ok".to_string()),
        ]);
        let mut agent = agent_with(&PAGES, llm, ws.path()).await;
        agent.settings.max_sections = 2;

        let diagnosis = agent.diagnose("engine coolant").await.unwrap();
        assert_eq!(diagnosis.sections.len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_append_only_across_queries() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("first".to_string()),
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("second".to_string()),
        ]);
        let mut agent = agent_with(&PAGES, llm, ws.path()).await;

        agent.diagnose("engine overheating").await.unwrap();
        agent.diagnose("brake pads").await.unwrap();

        let contents: Vec<&str> = agent
            .history()
            .iter()
            .filter(|h| h.kind == HistoryKind::Diagnosis)
            .map(|h| h.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(agent.history().len(), 4);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let ws = TempDir::new().unwrap();
        let llm = ScriptedLlm::new(vec![]);
        let mut agent = agent_with(&PAGES, llm.clone(), ws.path()).await;

        assert!(agent.diagnose("   ").await.is_err());
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_workspace_prompt_override() {
        let ws = TempDir::new().unwrap();
        let prompts = ws.path().join(".patriot/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(
            prompts.join("diagnose.answer.yml"),
            "id: diagnose.answer\ntitle: Terse\napiVersion: \"1.0\"\ntemplate: \"Q={{query}} CTX={{manualContext}}\"\n",
        )
        .unwrap();

        let llm = ScriptedLlm::new(vec![
            Ok(ANALYSIS_REPLY.to_string()),
            Ok("ok".to_string()),
        ]);
        let mut agent = agent_with(&PAGES, llm.clone(), ws.path()).await;
        agent.diagnose("brake pads").await.unwrap();

        let answer_request = &llm.requests()[1];
        assert!(answer_request.prompt.starts_with("Q=brake pads CTX="));
        assert!(answer_request.system.is_none());
    }

    #[test]
    fn test_extract_recommendations() {
        let answer = "Intro line\n1. First step\n2) Second step\n   - nested bullet\n* star\n• dot\n2020 was a year\n10. Tenth";
        assert_eq!(
            extract_recommendations(answer),
            vec!["First step", "Second step", "nested bullet", "star", "dot", "Tenth"]
        );
    }

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig::default();
        let settings = AgentSettings::from_config(&config);
        assert_eq!(settings, AgentSettings::default());
    }
}
