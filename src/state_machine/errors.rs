use crate::error::LimsError;
use thiserror::Error;

/// Errors raised while reading or writing workflow state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Unknown workflow state {state} for {portal_type}")]
    UnknownState { portal_type: String, state: String },

    #[error("Empty workflow id for {uid}")]
    MissingWorkflowId { uid: String },
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;

impl From<StateMachineError> for LimsError {
    fn from(err: StateMachineError) -> Self {
        LimsError::StateMachine(format!("{err}"))
    }
}
