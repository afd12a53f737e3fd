use crate::constants::transitions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow transitions the orchestrator asks the engine to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Skip sampling and expect the sample at the laboratory
    NoSamplingWorkflow,
    /// Wait for a sampler to collect the sample
    ToBeSampled,
    Receive,
    Reject,
    /// Make an analysis available once its sample is received
    Initialize,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSamplingWorkflow => transitions::NO_SAMPLING_WORKFLOW,
            Self::ToBeSampled => transitions::TO_BE_SAMPLED,
            Self::Receive => transitions::RECEIVE,
            Self::Reject => transitions::REJECT,
            Self::Initialize => transitions::INITIALIZE,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking the engine for a transition. A rejected guard is an
/// expected outcome the caller branches on, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Succeeded,
    GuardRejected(String),
}

impl TransitionOutcome {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::GuardRejected(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded => "",
            Self::GuardRejected(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_names() {
        assert_eq!(Transition::NoSamplingWorkflow.as_str(), "no_sampling_workflow");
        assert_eq!(Transition::ToBeSampled.to_string(), "to_be_sampled");
        assert_eq!(Transition::Initialize.as_str(), "initialize");
    }

    #[test]
    fn test_outcome() {
        assert!(TransitionOutcome::Succeeded.is_success());
        let rejected = TransitionOutcome::rejected("DateReceived not set");
        assert!(!rejected.is_success());
        assert_eq!(rejected.message(), "DateReceived not set");
    }
}
