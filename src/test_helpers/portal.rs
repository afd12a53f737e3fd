use crate::config::LimsConfig;
use crate::models::Uid;
use crate::orchestration::{OrchestratorCollaborators, SampleOrchestrator};
use crate::test_helpers::{
    InMemoryContentStore, InMemorySetupCatalog, RecordingActionExecutor, RecordingMailHost,
    ScriptedWorkflowEngine, StaticPdfRenderer,
};
use std::sync::Arc;

/// A complete set of in-memory collaborators plus a client to create
/// samples in
#[derive(Debug)]
pub struct TestPortal {
    pub client: Uid,
    pub config: LimsConfig,
    pub store: Arc<InMemoryContentStore>,
    pub catalog: Arc<InMemorySetupCatalog>,
    pub engine: Arc<ScriptedWorkflowEngine>,
    pub executor: Arc<RecordingActionExecutor>,
    pub mail_host: Arc<RecordingMailHost>,
    pub renderer: Arc<StaticPdfRenderer>,
}

impl Default for TestPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPortal {
    pub fn new() -> Self {
        Self::with_engine(ScriptedWorkflowEngine::new())
    }

    pub fn with_engine(engine: ScriptedWorkflowEngine) -> Self {
        Self {
            client: Uid::generate(),
            config: LimsConfig::default(),
            store: Arc::new(InMemoryContentStore::new()),
            catalog: Arc::new(InMemorySetupCatalog::new()),
            engine: Arc::new(engine),
            executor: Arc::new(RecordingActionExecutor::default()),
            mail_host: Arc::new(RecordingMailHost::new()),
            renderer: Arc::new(StaticPdfRenderer::new()),
        }
    }

    pub fn with_mail_host(mut self, mail_host: RecordingMailHost) -> Self {
        self.mail_host = Arc::new(mail_host);
        self
    }

    pub fn collaborators(&self) -> OrchestratorCollaborators {
        OrchestratorCollaborators {
            store: self.store.clone(),
            catalog: self.catalog.clone(),
            engine: self.engine.clone(),
            executor: self.executor.clone(),
            renderer: self.renderer.clone(),
            mail_host: self.mail_host.clone(),
        }
    }

    pub fn orchestrator(&self) -> SampleOrchestrator {
        SampleOrchestrator::new(self.config.clone(), self.collaborators())
    }
}
