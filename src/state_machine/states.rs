use super::errors::{StateMachineError, StateMachineResult};
use crate::constants::portal_types;
use serde::{Deserialize, Serialize};
use std::fmt;

fn unknown_state(portal_type: &str, state: &str) -> StateMachineError {
    StateMachineError::UnknownState {
        portal_type: portal_type.to_string(),
        state: state.to_string(),
    }
}

/// Sample (Analysis Request) lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleState {
    /// Created, no workflow transition applied yet
    SampleRegistered,
    /// Waiting for a sampler to collect it
    ToBeSampled,
    /// Sampling scheduled for a future date
    ScheduledSampling,
    /// Collected, waiting for preservation
    ToBePreserved,
    /// Expected at the laboratory
    SampleDue,
    /// Physically received by the laboratory
    SampleReceived,
    /// All results submitted, awaiting verification
    ToBeVerified,
    Verified,
    Published,
    /// Published results were retracted; a retest may be created
    Invalid,
    /// Refused by the laboratory
    Rejected,
    Cancelled,
}

impl SampleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SampleRegistered => "sample_registered",
            Self::ToBeSampled => "to_be_sampled",
            Self::ScheduledSampling => "scheduled_sampling",
            Self::ToBePreserved => "to_be_preserved",
            Self::SampleDue => "sample_due",
            Self::SampleReceived => "sample_received",
            Self::ToBeVerified => "to_be_verified",
            Self::Verified => "verified",
            Self::Published => "published",
            Self::Invalid => "invalid",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// States in which the laboratory already holds the specimen
    pub fn is_received(&self) -> bool {
        matches!(
            self,
            Self::SampleReceived | Self::ToBeVerified | Self::Verified | Self::Published
        )
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for SampleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SampleState {
    type Err = StateMachineError;

    fn from_str(s: &str) -> StateMachineResult<Self> {
        match s {
            "sample_registered" => Ok(Self::SampleRegistered),
            "to_be_sampled" => Ok(Self::ToBeSampled),
            "scheduled_sampling" => Ok(Self::ScheduledSampling),
            "to_be_preserved" => Ok(Self::ToBePreserved),
            "sample_due" => Ok(Self::SampleDue),
            "sample_received" => Ok(Self::SampleReceived),
            "to_be_verified" => Ok(Self::ToBeVerified),
            "verified" => Ok(Self::Verified),
            "published" => Ok(Self::Published),
            "invalid" => Ok(Self::Invalid),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(unknown_state(portal_types::ANALYSIS_REQUEST, s)),
        }
    }
}

/// Analysis lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    /// Created, waiting for its sample to be received
    Registered,
    /// Ready to be assigned to a worksheet
    Unassigned,
    Assigned,
    ToBeVerified,
    Verified,
    Published,
    /// Result withdrawn; a new analysis replaces it
    Retracted,
    /// Replaced by reflex testing rules
    Reflexed,
    Rejected,
    Cancelled,
}

impl AnalysisState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::ToBeVerified => "to_be_verified",
            Self::Verified => "verified",
            Self::Published => "published",
            Self::Retracted => "retracted",
            Self::Reflexed => "reflexed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Intermediate analyses are superseded and never carried into a retest
    pub fn is_intermediate(&self) -> bool {
        matches!(self, Self::Retracted | Self::Reflexed)
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisState {
    type Err = StateMachineError;

    fn from_str(s: &str) -> StateMachineResult<Self> {
        match s {
            "registered" => Ok(Self::Registered),
            "unassigned" => Ok(Self::Unassigned),
            "assigned" => Ok(Self::Assigned),
            "to_be_verified" => Ok(Self::ToBeVerified),
            "verified" => Ok(Self::Verified),
            "published" => Ok(Self::Published),
            "retracted" => Ok(Self::Retracted),
            "reflexed" => Ok(Self::Reflexed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(unknown_state(portal_types::ANALYSIS, s)),
        }
    }
}

/// Whether a raw analysis status names an intermediate state
pub fn is_intermediate_analysis_state(status: Option<&str>) -> bool {
    status
        .and_then(|s| s.parse::<AnalysisState>().ok())
        .is_some_and(|state| state.is_intermediate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intermediate_states() {
        assert!(AnalysisState::Retracted.is_intermediate());
        assert!(AnalysisState::Reflexed.is_intermediate());
        assert!(!AnalysisState::Unassigned.is_intermediate());
        assert!(is_intermediate_analysis_state(Some("retracted")));
        assert!(!is_intermediate_analysis_state(Some("verified")));
        assert!(!is_intermediate_analysis_state(None));
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(SampleState::SampleReceived.to_string(), "sample_received");
        assert_eq!(
            "invalid".parse::<SampleState>().unwrap(),
            SampleState::Invalid
        );
        assert_eq!(
            "bogus".parse::<SampleState>().unwrap_err(),
            StateMachineError::UnknownState {
                portal_type: "AnalysisRequest".to_string(),
                state: "bogus".to_string(),
            }
        );
        let err: crate::error::LimsError = "open".parse::<AnalysisState>().unwrap_err().into();
        assert!(err.to_string().contains("Unknown workflow state open for Analysis"));

        assert_eq!(AnalysisState::Unassigned.to_string(), "unassigned");
        assert_eq!(
            "reflexed".parse::<AnalysisState>().unwrap(),
            AnalysisState::Reflexed
        );
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&SampleState::ToBeSampled).unwrap();
        assert_eq!(json, "\"to_be_sampled\"");
        let parsed: SampleState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SampleState::ToBeSampled);
    }

    #[test]
    fn test_received_states() {
        assert!(SampleState::SampleReceived.is_received());
        assert!(SampleState::Published.is_received());
        assert!(!SampleState::SampleDue.is_received());
        assert!(SampleState::Rejected.is_terminal());
    }
}
