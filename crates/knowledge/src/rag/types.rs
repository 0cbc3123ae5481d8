//! Diagnostic pipeline types.

use crate::sections::Section;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reply used when the diagnosis request to the LLM fails.
pub const DIAGNOSIS_ERROR_TEXT: &str = "I apologize, but I encountered an error while analyzing the manual content. Please try again.";

/// Reply used when no manual content matched the query.
pub fn no_information_text(query: &str) -> String {
    format!(
        r#"I apologize, but I cannot find any information about "{query}" in the 2011 Jeep Patriot manual.

I can only provide diagnostic assistance based on the official manual content. Please try rephrasing your question using specific automotive terms like:
- Engine problems
- Transmission issues
- Brake concerns
- Electrical problems
- Cooling system
- Maintenance procedures

Or describe specific symptoms you're experiencing with your Patriot."#
    )
}

/// Kind of a conversation history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Analysis,
    Diagnosis,
}

/// One entry of the append-only conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(kind: HistoryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Structured view of the LLM's query analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl QueryAnalysis {
    /// Parse the first JSON object embedded in an LLM reply.
    ///
    /// Tolerates surrounding prose and Markdown code fences.
    pub fn parse_lenient(reply: &str) -> Option<Self> {
        let start = reply.find('{')?;
        let end = reply.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&reply[start..=end]).ok()
    }
}

/// State threaded through the five pipeline steps for one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosticState {
    pub user_query: String,
    pub manual_sections: BTreeMap<Section, String>,
    pub analysis: Option<QueryAnalysis>,
    pub relevant_sections: Vec<String>,
    pub diagnosis: String,
    pub recommendations: Vec<String>,
    pub conversation_history: Vec<HistoryEntry>,
}

impl DiagnosticState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            user_query: query.into(),
            ..Default::default()
        }
    }
}

/// Result of one diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub query: String,

    /// Final answer text shown to the user
    pub answer: String,

    /// Manual passages the answer was based on
    pub sections: Vec<String>,

    /// Numbered or bulleted steps pulled from the answer
    pub recommendations: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<QueryAnalysis>,
}

impl From<DiagnosticState> for Diagnosis {
    fn from(state: DiagnosticState) -> Self {
        Self {
            query: state.user_query,
            answer: state.diagnosis,
            sections: state.relevant_sections,
            recommendations: state.recommendations,
            analysis: state.analysis,
        }
    }
}
