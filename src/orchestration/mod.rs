//! # Sample Lifecycle Orchestration
//!
//! Coordinates the multi-step operations that create and derive samples.
//!
//! ## Core Components
//!
//! - **ActionBatcher**: Defers reindex side effects to the end of a bulk operation
//! - **ServiceResolver**: Turns uids, keywords, titles and live objects into service uids
//! - **FieldCopier**: Copies stored field values between objects through their manifests
//! - **SampleOrchestrator**: Sample, retest and partition creation plus rejection notices
//!
//! Workflow transitions go through [`crate::state_machine::WorkflowDriver`].

pub mod action_batcher;
pub mod field_copier;
pub mod sample_orchestrator;
pub mod service_resolver;

pub use action_batcher::{ActionBatcher, DeferredAction, FlushReport};
pub use field_copier::FieldCopier;
pub use sample_orchestrator::{
    FieldOverride, OrchestratorCollaborators, PartitionOptions, SampleOrchestrator,
};
pub use service_resolver::{ServiceRef, ServiceResolver};
