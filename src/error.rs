//! Error types for the sample lifecycle core.
//!

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimsError {
    #[error("Precondition violated: {0}")]
    Precondition(String),
    #[error("{kind} not found: {uid}")]
    NotFound { kind: String, uid: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Workflow error: {0}")]
    Workflow(String),
    #[error("Catalog error: {0}")]
    Catalog(String),
    #[error("Rendering error: {0}")]
    Rendering(String),
    #[error("Mail transport error: {0}")]
    Mail(String),
    #[error("Queue error: {0}")]
    Queue(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("State machine error: {0}")]
    StateMachine(String),
}

impl LimsError {
    /// Precondition failures abort an operation before any object is created
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn not_found(kind: impl Into<String>, uid: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            uid: uid.to_string(),
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }
}

impl From<serde_json::Error> for LimsError {
    fn from(error: serde_json::Error) -> Self {
        LimsError::Validation(format!("JSON serialization error: {error}"))
    }
}

impl From<config::ConfigError> for LimsError {
    fn from(error: config::ConfigError) -> Self {
        LimsError::Configuration(error.to_string())
    }
}

pub type LimsResult<T> = std::result::Result<T, LimsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LimsError::precondition("Retest already set");
        assert_eq!(err.to_string(), "Precondition violated: Retest already set");
        assert!(err.is_precondition());

        let err = LimsError::not_found("AnalysisRequest", "abc");
        assert_eq!(err.to_string(), "AnalysisRequest not found: abc");
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: LimsError = parse_err.into();
        assert!(matches!(err, LimsError::Validation(_)));
    }
}
