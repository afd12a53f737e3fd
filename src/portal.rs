//! # Portal Collaborators
//!
//! Traits for the services the orchestrator relies on but does not own:
//! object creation and storage, the setup catalog, the workflow engine,
//! mail transport, PDF rendering, the asynchronous analysis queue and the
//! executor for deferred side effects. Implementations are injected when an
//! orchestrator is built; in-memory versions live in `test_helpers`.

use crate::error::LimsResult;
use crate::models::{
    Analysis, AnalysisService, Attachment, Contact, Content, FieldValues, Profile,
    RequestContext, ResultsRange, Sample, SampleTemplate, Uid,
};
use crate::orchestration::action_batcher::DeferredAction;
use crate::state_machine::TransitionOutcome;
use async_trait::async_trait;
use std::collections::HashMap;

/// Price overrides keyed by service uid
pub type ServicePrices = HashMap<Uid, f64>;

/// Object creation, id assignment and persistence
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create an empty sample inside `container` under a temporary id
    async fn create_sample(&self, container: &Uid, temporary_id: &str) -> LimsResult<Sample>;

    /// Create an empty analysis for `sample`. The caller attaches it.
    async fn create_analysis(&self, sample: &Sample, id: &str) -> LimsResult<Analysis>;

    /// Apply submitted values the way the edit form would. A sample still
    /// under its temporary id receives its permanent id here.
    async fn process_form(
        &self,
        sample: &mut Sample,
        request: &RequestContext,
        values: &FieldValues,
    ) -> LimsResult<()>;

    /// Replace the temporary id with a permanent one from the id server
    async fn assign_permanent_id(&self, sample: &mut Sample) -> LimsResult<String>;

    async fn get_sample(&self, uid: &Uid) -> LimsResult<Option<Sample>>;

    async fn save_sample(&self, sample: &Sample) -> LimsResult<()>;

    async fn get_contact(&self, uid: &Uid) -> LimsResult<Option<Contact>>;

    async fn create_attachment(
        &self,
        container: &Uid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> LimsResult<Attachment>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceQuery {
    Keyword(String),
    Title(String),
}

/// Lookups against the setup catalog
#[async_trait]
pub trait SetupCatalog: Send + Sync {
    async fn get_service(&self, uid: &Uid) -> LimsResult<Option<AnalysisService>>;

    /// All services matching the query, in catalog order
    async fn search_services(&self, query: &ServiceQuery) -> LimsResult<Vec<AnalysisService>>;

    async fn get_profile(&self, uid: &Uid) -> LimsResult<Option<Profile>>;

    async fn get_template(&self, uid: &Uid) -> LimsResult<Option<SampleTemplate>>;
}

/// The workflow engine's transition executor
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Perform `transition` on `object`, recording history on success.
    /// An unmet guard is reported as `GuardRejected`, never as an error.
    async fn do_action(
        &self,
        object: &mut dyn Content,
        transition: &str,
    ) -> LimsResult<TransitionOutcome>;
}

#[async_trait]
pub trait MailHost: Send + Sync {
    async fn send(&self, message: &str, immediate: bool) -> LimsResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionTemplate {
    /// Report stored on the sample and attached to the email
    Pdf,
    /// Email body
    Email,
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render_template(
        &self,
        sample: &Sample,
        template: RejectionTemplate,
    ) -> LimsResult<String>;

    /// Render HTML to PDF bytes; `None` when nothing could be produced
    async fn create_pdf(&self, html: &str) -> LimsResult<Option<Vec<u8>>>;
}

/// Out-of-band analysis assignment, processed by an external worker
#[async_trait]
pub trait AnalysisAssigner: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn enqueue_analysis_assignment(
        &self,
        sample: &Sample,
        request: &RequestContext,
        services: &[Uid],
        prices: Option<&ServicePrices>,
        ranges: &[ResultsRange],
    ) -> LimsResult<()>;
}

/// Executes side effects once the batching region that deferred them closes
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, uid: &Uid, action: &DeferredAction) -> LimsResult<()>;
}
