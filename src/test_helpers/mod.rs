// Test Helpers Module - In-memory collaborators
//
// Implementations of the portal traits that keep everything in memory and
// record what they were asked to do. Used by the unit tests and by the
// integration tests under tests/.

pub mod catalog;
pub mod doubles;
pub mod portal;
pub mod store;
pub mod workflow;

pub use catalog::InMemorySetupCatalog;
pub use doubles::{
    AssignmentRequest, RecordingActionExecutor, RecordingAnalysisAssigner, RecordingMailHost,
    StaticPdfRenderer,
};
pub use portal::TestPortal;
pub use store::InMemoryContentStore;
pub use workflow::ScriptedWorkflowEngine;
