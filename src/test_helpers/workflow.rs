use crate::constants::{portal_types, transitions};
use crate::error::LimsResult;
use crate::models::{Content, Uid};
use crate::portal::WorkflowEngine;
use crate::state_machine::{AnalysisState, SampleState, TransitionOutcome, TransitionRecord};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Workflow engine with a fixed, simplified rule set:
///
/// - samples: `no_sampling_workflow` and `to_be_sampled` from the initial
///   state depending on whether the sampling workflow is enabled,
///   `receive` from `sample_due`, `reject` from any non-terminal state
/// - analyses: `initialize` from the initial state unless blocked
///
/// Every attempt is recorded, successful or not.
#[derive(Debug, Default)]
pub struct ScriptedWorkflowEngine {
    sampling_workflow_enabled: bool,
    block_initialize: bool,
    attempted: Mutex<Vec<(Uid, String)>>,
}

impl ScriptedWorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sampling_workflow(mut self, enabled: bool) -> Self {
        self.sampling_workflow_enabled = enabled;
        self
    }

    /// Make the analysis `initialize` guard fail
    pub fn blocking_initialize(mut self) -> Self {
        self.block_initialize = true;
        self
    }

    pub fn attempted(&self) -> Vec<(Uid, String)> {
        self.attempted.lock().clone()
    }

    /// Transitions attempted on one object, in order
    pub fn attempted_on(&self, uid: &Uid) -> Vec<String> {
        self.attempted
            .lock()
            .iter()
            .filter(|(attempted_uid, _)| attempted_uid == uid)
            .map(|(_, transition)| transition.clone())
            .collect()
    }

    fn sample_target(&self, current: Option<&str>, transition: &str) -> Option<SampleState> {
        let initial = current.is_none() || current == Some(SampleState::SampleRegistered.as_str());
        match transition {
            transitions::NO_SAMPLING_WORKFLOW if initial && !self.sampling_workflow_enabled => {
                Some(SampleState::SampleDue)
            }
            transitions::TO_BE_SAMPLED if initial && self.sampling_workflow_enabled => {
                Some(SampleState::ToBeSampled)
            }
            transitions::RECEIVE if current == Some(SampleState::SampleDue.as_str()) => {
                Some(SampleState::SampleReceived)
            }
            transitions::REJECT => {
                let terminal = current
                    .and_then(|state| state.parse::<SampleState>().ok())
                    .is_some_and(|state| state.is_terminal());
                (!terminal).then_some(SampleState::Rejected)
            }
            _ => None,
        }
    }

    fn analysis_target(&self, current: Option<&str>, transition: &str) -> Option<AnalysisState> {
        let initial = current.is_none() || current == Some(AnalysisState::Registered.as_str());
        match transition {
            transitions::INITIALIZE if initial && !self.block_initialize => {
                Some(AnalysisState::Unassigned)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl WorkflowEngine for ScriptedWorkflowEngine {
    async fn do_action(
        &self,
        object: &mut dyn Content,
        transition: &str,
    ) -> LimsResult<TransitionOutcome> {
        // Suspend like a real engine would, so concurrent callers interleave
        tokio::task::yield_now().await;
        self.attempted
            .lock()
            .push((object.uid().clone(), transition.to_string()));

        let current = object.review_state();
        let target = match object.portal_type() {
            portal_types::ANALYSIS_REQUEST => self
                .sample_target(current, transition)
                .map(|state| ("bika_ar_workflow", state.as_str())),
            portal_types::ANALYSIS => self
                .analysis_target(current, transition)
                .map(|state| ("bika_analysis_workflow", state.as_str())),
            _ => None,
        };

        let Some((workflow_id, state)) = target else {
            return Ok(TransitionOutcome::rejected(format!(
                "Transition {transition} is not available from {}",
                current.unwrap_or("initial state")
            )));
        };

        object.workflow_history_mut().push(TransitionRecord::new(
            workflow_id,
            Some(transition),
            state,
            "system",
            "",
        ));
        Ok(TransitionOutcome::Succeeded)
    }
}
