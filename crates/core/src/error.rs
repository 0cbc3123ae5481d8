//! Error types for the Patriot manual assistant.
//!
//! A single error enum covers every failure category in the workspace:
//! configuration, I/O, manual loading, LLM calls, knowledge indexing and
//! prompt rendering.

use thiserror::Error;

/// Unified error type for the Patriot manual assistant.
///
/// All fallible functions return `Result<T, AppError>`. Errors are turned
/// into user-facing text only at the CLI edge.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing API key, bad YAML, unknown provider)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manual (PDF) loading errors
    #[error("Manual error: {0}")]
    Manual(String),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding, index and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Manual("Manual PDF not found at manual.pdf".to_string());
        assert_eq!(
            err.to_string(),
            "Manual error: Manual PDF not found at manual.pdf"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(err.to_string().contains("gone"));
    }
}
