//! # Workflow Driver
//!
//! Thin layer over the workflow engine. Normal transitions go through the
//! engine and its guards; a guard that is not met is an expected outcome the
//! caller branches on. Objects derived by copying from another object that is
//! already past some guarded state get that state forced instead, since the
//! fields the guard checks are only set after the transition would run.

use crate::error::LimsResult;
use crate::logging::log_workflow_operation;
use crate::models::{Content, Sample};
use crate::orchestration::action_batcher::{ActionBatcher, DeferredAction};
use crate::portal::WorkflowEngine;
use crate::state_machine::errors::StateMachineError;
use crate::state_machine::history::TransitionRecord;
use crate::state_machine::transitions::{Transition, TransitionOutcome};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct WorkflowDriver {
    engine: Arc<dyn WorkflowEngine>,
    batcher: Arc<ActionBatcher>,
}

impl std::fmt::Debug for WorkflowDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDriver")
            .field("batcher", &self.batcher)
            .finish_non_exhaustive()
    }
}

impl WorkflowDriver {
    pub fn new(engine: Arc<dyn WorkflowEngine>, batcher: Arc<ActionBatcher>) -> Self {
        Self { engine, batcher }
    }

    pub fn batcher(&self) -> &Arc<ActionBatcher> {
        &self.batcher
    }

    /// Ask the engine to perform a transition. Engine failures propagate;
    /// unmet guards come back as `GuardRejected`.
    pub async fn attempt_transition(
        &self,
        object: &mut dyn Content,
        transition: Transition,
    ) -> LimsResult<TransitionOutcome> {
        let outcome = self.engine.do_action(object, transition.as_str()).await?;
        match &outcome {
            TransitionOutcome::Succeeded => {
                log_workflow_operation(
                    "attempt_transition",
                    object.uid().as_str(),
                    Some(transition.as_str()),
                    object.review_state(),
                    Some(object.portal_type()),
                );
                self.batcher.push(object.uid(), DeferredAction::Reindex).await;
            }
            TransitionOutcome::GuardRejected(message) => {
                debug!(
                    uid = %object.uid(),
                    transition = %transition,
                    message = %message,
                    "Transition guard not met"
                );
            }
        }
        Ok(outcome)
    }

    /// Try `transition` on every analysis of the sample, returning how many
    /// of them moved
    pub async fn do_action_to_analyses(
        &self,
        sample: &mut Sample,
        transition: Transition,
    ) -> LimsResult<usize> {
        let mut moved = 0;
        for analysis in sample.analyses_mut() {
            if self.attempt_transition(analysis, transition).await?.is_success() {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Record `state_id` as the object's current state without consulting
    /// guards. Only for objects copied from one already in that state; the
    /// caller is responsible for the copied fields backing the state.
    pub(crate) async fn force_state(
        &self,
        object: &mut dyn Content,
        workflow_id: &str,
        state_id: &str,
        action: Option<&str>,
        comments: &str,
        actor: &str,
    ) -> LimsResult<()> {
        if workflow_id.is_empty() {
            return Err(StateMachineError::MissingWorkflowId {
                uid: object.uid().to_string(),
            }
            .into());
        }

        let record = TransitionRecord::new(workflow_id, action, state_id, actor, comments);
        object.workflow_history_mut().push(record);
        debug!(
            uid = %object.uid(),
            workflow = workflow_id,
            state = state_id,
            "Forced workflow state"
        );
        self.batcher.push(object.uid(), DeferredAction::Reindex).await;
        Ok(())
    }
}
