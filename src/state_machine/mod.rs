// Workflow state for samples and analyses
//
// The workflow engine itself is an external collaborator; this module holds the
// state and transition vocabulary, the recorded history, and the driver that
// sits between the orchestrator and the engine.

pub mod driver;
pub mod errors;
pub mod history;
pub mod states;
pub mod transitions;

pub use driver::WorkflowDriver;
pub use errors::{StateMachineError, StateMachineResult};
pub use history::TransitionRecord;
pub use states::{is_intermediate_analysis_state, AnalysisState, SampleState};
pub use transitions::{Transition, TransitionOutcome};
