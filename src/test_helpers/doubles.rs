use crate::error::{LimsError, LimsResult};
use crate::models::{Content, RequestContext, ResultsRange, Sample, Uid};
use crate::orchestration::action_batcher::DeferredAction;
use crate::portal::{
    ActionExecutor, AnalysisAssigner, MailHost, PdfRenderer, RejectionTemplate, ServicePrices,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Mail host that records every raw message it is asked to send
#[derive(Debug, Default)]
pub struct RecordingMailHost {
    sent: Mutex<Vec<(String, bool)>>,
    fail: bool,
}

impl RecordingMailHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the message, then fail as an unreachable SMTP server would
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, bool)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MailHost for RecordingMailHost {
    async fn send(&self, message: &str, immediate: bool) -> LimsResult<()> {
        self.sent.lock().push((message.to_string(), immediate));
        if self.fail {
            return Err(LimsError::Mail("SMTP connection refused".to_string()));
        }
        Ok(())
    }
}

/// Renderer producing fixed HTML and, unless disabled, fixed PDF bytes
#[derive(Debug)]
pub struct StaticPdfRenderer {
    pdf: Option<Vec<u8>>,
}

impl Default for StaticPdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPdfRenderer {
    pub fn new() -> Self {
        Self {
            pdf: Some(b"%PDF-1.4 rejection".to_vec()),
        }
    }

    pub fn without_pdf() -> Self {
        Self { pdf: None }
    }
}

#[async_trait]
impl PdfRenderer for StaticPdfRenderer {
    async fn render_template(
        &self,
        sample: &Sample,
        template: RejectionTemplate,
    ) -> LimsResult<String> {
        Ok(format!(
            "<html><body>{template:?}: {} was rejected</body></html>",
            sample.id()
        ))
    }

    async fn create_pdf(&self, _html: &str) -> LimsResult<Option<Vec<u8>>> {
        Ok(self.pdf.clone())
    }
}

/// One queued analysis assignment
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    pub sample: Uid,
    pub actor: String,
    pub services: Vec<Uid>,
    pub prices: Option<ServicePrices>,
    pub ranges: Vec<ResultsRange>,
}

#[derive(Debug)]
pub struct RecordingAnalysisAssigner {
    enabled: bool,
    queued: Mutex<Vec<AssignmentRequest>>,
}

impl RecordingAnalysisAssigner {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            queued: Mutex::new(Vec::new()),
        }
    }

    pub fn queued(&self) -> Vec<AssignmentRequest> {
        self.queued.lock().clone()
    }
}

#[async_trait]
impl AnalysisAssigner for RecordingAnalysisAssigner {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn enqueue_analysis_assignment(
        &self,
        sample: &Sample,
        request: &RequestContext,
        services: &[Uid],
        prices: Option<&ServicePrices>,
        ranges: &[ResultsRange],
    ) -> LimsResult<()> {
        self.queued.lock().push(AssignmentRequest {
            sample: sample.uid().clone(),
            actor: request.actor.clone(),
            services: services.to_vec(),
            prices: prices.cloned(),
            ranges: ranges.to_vec(),
        });
        Ok(())
    }
}

/// Executor that records deferred actions in execution order
#[derive(Debug, Default)]
pub struct RecordingActionExecutor {
    executed: Mutex<Vec<(Uid, DeferredAction)>>,
}

impl RecordingActionExecutor {
    pub fn executed(&self) -> Vec<(Uid, DeferredAction)> {
        self.executed.lock().clone()
    }

    /// How many times `action` ran for `uid`
    pub fn count(&self, uid: &Uid, action: &DeferredAction) -> usize {
        self.executed
            .lock()
            .iter()
            .filter(|(executed_uid, executed)| executed_uid == uid && executed == action)
            .count()
    }
}

#[async_trait]
impl ActionExecutor for RecordingActionExecutor {
    async fn execute(&self, uid: &Uid, action: &DeferredAction) -> LimsResult<()> {
        tokio::task::yield_now().await;
        self.executed.lock().push((uid.clone(), action.clone()));
        Ok(())
    }
}
