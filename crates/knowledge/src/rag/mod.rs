//! Manual-grounded diagnosis over the retriever and an LLM.

pub mod agent;
pub mod types;

pub use agent::{extract_recommendations, AgentSettings, DiagnosticAgent, AUTOMOTIVE_TERMS};
pub use types::{Diagnosis, DiagnosticState, HistoryEntry, HistoryKind, QueryAnalysis};
