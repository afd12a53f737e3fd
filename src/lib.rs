#![allow(clippy::doc_markdown)] // Allow technical terms like LIMS, MIME in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # LIMS Core
//!
//! Sample lifecycle orchestration for a laboratory information management
//! system.
//!
//! ## Overview
//!
//! A sample (Analysis Request) moves through a sequence of interdependent
//! steps: it is created empty, populated from submitted values, given its
//! analyses and driven to an initial workflow state. Secondary samples,
//! retests and partitions are derived from existing samples by copying
//! their values and forcing the state they must start in. Rejections are
//! reported to the sample's contacts by email with a rendered report.
//!
//! Persistence, the workflow engine, mail transport and PDF rendering are
//! external collaborators reached through the traits in [`portal`].
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Sample orchestrator, service resolution, field copying, action batching
//! - [`state_machine`] - Sample and analysis states, transitions, the workflow driver
//! - [`models`] - Samples, analyses, services, contacts and their field manifests
//! - [`notifications`] - Rejection emails and MIME composition
//! - [`portal`] - Collaborator traits
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`events`] - Lifecycle event broadcasting
//! - [`logging`] - Structured logging setup
//! - [`test_helpers`] - In-memory collaborators for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lims_core::models::{Content, FieldValues, RequestContext};
//! use lims_core::test_helpers::TestPortal;
//!
//! # async fn example() -> Result<(), lims_core::LimsError> {
//! let portal = TestPortal::new();
//! let orchestrator = portal.orchestrator();
//!
//! let sample = orchestrator
//!     .create_sample(
//!         &portal.client,
//!         &RequestContext::default(),
//!         &FieldValues::new(),
//!         &["Ca".into()],
//!         &[],
//!         None,
//!     )
//!     .await?;
//! println!("{} is {:?}", sample.id(), sample.review_state());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod orchestration;
pub mod portal;
pub mod state_machine;
pub mod test_helpers;

pub use config::LimsConfig;
pub use error::{LimsError, LimsResult};
pub use events::{EventPublisher, PublishedEvent};
pub use logging::init_structured_logging;
pub use models::{Analysis, Content, FieldValues, RequestContext, Sample, Uid};
pub use orchestration::{
    ActionBatcher, DeferredAction, FieldCopier, OrchestratorCollaborators, PartitionOptions,
    SampleOrchestrator, ServiceRef, ServiceResolver,
};
pub use state_machine::{SampleState, Transition, TransitionOutcome, WorkflowDriver};
