//! # Sample Orchestrator
//!
//! Creates samples and the samples derived from them.
//!
//! ## Overview
//!
//! - **create_sample**: builds a sample from submitted values, attaches its
//!   analyses (or queues their assignment) and drives it to its initial
//!   state. Secondary samples of an already received primary are forced to
//!   received instead.
//! - **create_retest**: copies an invalidated sample and its non-intermediate
//!   analyses into a new, received sample.
//! - **create_partition**: derives a sample from a parent, sharing most of its
//!   values but with its own analyses, and aligns it with the parent's state.
//! - **notify_rejection**: emails the sample's contacts about its rejection.
//!
//! Steps run sequentially and assume the earlier ones succeeded. There is no
//! rollback: an error part way through leaves whatever was already created.

use crate::config::LimsConfig;
use crate::constants::{
    events, fields, indexes, PARTITION_SKIP_FIELDS, RETEST_ANALYSIS_SKIP_FIELDS,
    RETEST_SKIP_FIELDS,
};
use crate::error::{LimsError, LimsResult};
use crate::events::EventPublisher;
use crate::logging::{log_error, log_sample_operation};
use crate::models::{
    get_hidden_service_uids, resolve_rejection_reasons, temporary_id, Content, FieldValues,
    Marker, RequestContext, ResultsRange, Sample, ServiceSettingsSource, Uid,
};
use crate::notifications::RejectionNotifier;
use crate::orchestration::action_batcher::{ActionBatcher, DeferredAction};
use crate::orchestration::field_copier::FieldCopier;
use crate::orchestration::service_resolver::{ServiceRef, ServiceResolver};
use crate::portal::{
    ActionExecutor, AnalysisAssigner, ContentStore, MailHost, PdfRenderer, ServicePrices,
    SetupCatalog, WorkflowEngine,
};
use crate::state_machine::{
    is_intermediate_analysis_state, AnalysisState, SampleState, Transition, WorkflowDriver,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// External services an orchestrator is built from
#[derive(Clone)]
pub struct OrchestratorCollaborators {
    pub store: Arc<dyn ContentStore>,
    pub catalog: Arc<dyn SetupCatalog>,
    pub engine: Arc<dyn WorkflowEngine>,
    pub executor: Arc<dyn ActionExecutor>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub mail_host: Arc<dyn MailHost>,
}

/// How a partition treats one of the fields it may override
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldOverride {
    /// Keep whatever was copied from the parent
    #[default]
    Keep,
    /// Store an empty value
    Clear,
    Set(Uid),
}

impl FieldOverride {
    fn apply(&self, record: &mut FieldValues, name: &str) {
        match self {
            Self::Keep => {}
            Self::Clear => {
                record.insert(name.to_string(), Value::String(String::new()));
            }
            Self::Set(uid) => {
                record.insert(name.to_string(), Value::String(uid.to_string()));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOptions {
    pub sample_type: FieldOverride,
    pub container: FieldOverride,
    pub preservation: FieldOverride,
    /// Parent fields not copied, in addition to the fixed skip list
    pub skip_fields: Vec<String>,
    pub internal_use: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            sample_type: FieldOverride::Keep,
            container: FieldOverride::Keep,
            preservation: FieldOverride::Keep,
            skip_fields: Vec::new(),
            internal_use: true,
        }
    }
}

pub struct SampleOrchestrator {
    config: LimsConfig,
    store: Arc<dyn ContentStore>,
    catalog: Arc<dyn SetupCatalog>,
    resolver: ServiceResolver,
    batcher: Arc<ActionBatcher>,
    driver: WorkflowDriver,
    notifier: RejectionNotifier,
    assigner: Option<Arc<dyn AnalysisAssigner>>,
    event_publisher: EventPublisher,
}

impl std::fmt::Debug for SampleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleOrchestrator")
            .field("config", &self.config)
            .field("driver", &self.driver)
            .field("async_assigner", &self.assigner.is_some())
            .finish_non_exhaustive()
    }
}

impl SampleOrchestrator {
    pub fn new(config: LimsConfig, collaborators: OrchestratorCollaborators) -> Self {
        let batcher = Arc::new(ActionBatcher::new(collaborators.executor));
        let driver = WorkflowDriver::new(collaborators.engine, batcher.clone());
        let notifier = RejectionNotifier::new(
            config.clone(),
            collaborators.store.clone(),
            collaborators.renderer,
            collaborators.mail_host,
        );
        Self {
            config,
            resolver: ServiceResolver::new(collaborators.catalog.clone()),
            store: collaborators.store,
            catalog: collaborators.catalog,
            batcher,
            driver,
            notifier,
            assigner: None,
            event_publisher: EventPublisher::default(),
        }
    }

    /// Hand analysis assignment to an out-of-band worker whenever the
    /// assigner reports itself enabled
    pub fn with_async_assigner(mut self, assigner: Arc<dyn AnalysisAssigner>) -> Self {
        self.assigner = Some(assigner);
        self
    }

    pub fn with_event_publisher(mut self, event_publisher: EventPublisher) -> Self {
        self.event_publisher = event_publisher;
        self
    }

    pub fn config(&self) -> &LimsConfig {
        &self.config
    }

    pub fn batcher(&self) -> &Arc<ActionBatcher> {
        &self.batcher
    }

    pub fn resolver(&self) -> &ServiceResolver {
        &self.resolver
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.event_publisher
    }

    /// Create a sample inside `client` from submitted field values.
    ///
    /// Services come from `analyses` and from the `Analyses` and `Profiles`
    /// entries of `values`. `prices` override service prices by service uid.
    pub async fn create_sample(
        &self,
        client: &Uid,
        request: &RequestContext,
        values: &FieldValues,
        analyses: &[ServiceRef],
        results_ranges: &[ResultsRange],
        prices: Option<&ServicePrices>,
    ) -> LimsResult<Sample> {
        let operation =
            self.register_sample(client, request, values, analyses, results_ranges, prices);
        self.batcher.scoped(operation).await
    }

    async fn register_sample(
        &self,
        client: &Uid,
        request: &RequestContext,
        values: &FieldValues,
        analyses: &[ServiceRef],
        results_ranges: &[ResultsRange],
        prices: Option<&ServicePrices>,
    ) -> LimsResult<Sample> {
        let mut values = values.clone();
        let service_uids = self.resolver.resolve_service_uids(analyses, &values).await?;

        // Analyses are attached below, never through the form
        values.insert(fields::ANALYSES.to_string(), Value::Array(Vec::new()));

        let temporary = temporary_id(&self.config.ids.temporary_id_prefix);
        let mut sample = self.store.create_sample(client, &temporary).await?;
        self.store.process_form(&mut sample, request, &values).await?;

        let primary = self.resolve_primary(&sample).await?;
        if primary.is_none() {
            match self.enabled_assigner() {
                Some(assigner) => {
                    assigner
                        .enqueue_analysis_assignment(
                            &sample,
                            request,
                            &service_uids,
                            prices,
                            results_ranges,
                        )
                        .await?;
                    debug!(sample = %sample.id(), services = service_uids.len(), "Queued analysis assignment");
                }
                None => {
                    self.set_analyses(&mut sample, &service_uids, prices, results_ranges)
                        .await?;
                    self.apply_hidden_services(&mut sample).await?;
                }
            }
        }

        let rejection_reasons = resolve_rejection_reasons(&values);
        sample.set_rejection_reasons(&rejection_reasons);
        let rejected = !rejection_reasons.is_empty();

        if let Some(primary) = primary {
            if self
                .sync_with_primary(&mut sample, &primary, request, rejected)
                .await?
            {
                return self.finish_creation(sample).await;
            }
        }

        let outcome = self
            .driver
            .attempt_transition(&mut sample, Transition::NoSamplingWorkflow)
            .await?;
        if !outcome.is_success() {
            self.driver
                .attempt_transition(&mut sample, Transition::ToBeSampled)
                .await?;
        }

        if rejected {
            self.driver
                .attempt_transition(&mut sample, Transition::Reject)
                .await?;
        }

        self.finish_creation(sample).await
    }

    /// Create a retest of an invalidated sample. The source gets a reference
    /// to the new retest.
    pub async fn create_retest(
        &self,
        source: &mut Sample,
        request: &RequestContext,
    ) -> LimsResult<Sample> {
        self.batcher.scoped(self.retest_sample(source, request)).await
    }

    async fn retest_sample(
        &self,
        source: &mut Sample,
        request: &RequestContext,
    ) -> LimsResult<Sample> {
        if source.retest_uid().is_some() {
            return Err(LimsError::precondition(format!(
                "Sample {} already has a retest",
                source.id()
            )));
        }
        if !source.is_invalid() {
            return Err(LimsError::precondition(format!(
                "Cannot retest sample {} in state {}",
                source.id(),
                source.review_state().unwrap_or("none")
            )));
        }

        self.batcher.enter_batch();
        let built = self.build_retest(source, request).await;
        self.batcher.resume_batch().await;
        let retest = built.inspect_err(|e| {
            log_error("SampleOrchestrator", "create_retest", &e.to_string(), Some(source.id()))
        })?;

        source.set_retest(Some(retest.uid().clone()));
        self.store.save_sample(source).await?;

        log_sample_operation("create_retest", retest.id(), "created", Some(source.id()));
        self.publish(
            events::SAMPLE_RETEST_CREATED,
            &retest,
            Some(json!({"source": source.uid().as_str()})),
        );
        Ok(retest)
    }

    /// Look the source up by uid and create its retest
    pub async fn create_retest_by_uid(
        &self,
        source_uid: &Uid,
        request: &RequestContext,
    ) -> LimsResult<Sample> {
        let mut source = self
            .store
            .get_sample(source_uid)
            .await?
            .ok_or_else(|| LimsError::precondition("Source sample cannot be empty"))?;
        self.create_retest(&mut source, request).await
    }

    /// Create a partition of `parent` holding the services of the given
    /// parent analyses
    pub async fn create_partition(
        &self,
        parent: &Sample,
        request: &RequestContext,
        analyses: &[Uid],
        options: &PartitionOptions,
    ) -> LimsResult<Sample> {
        self.batcher
            .scoped(self.partition_sample(parent, request, analyses, options))
            .await
    }

    async fn partition_sample(
        &self,
        parent: &Sample,
        request: &RequestContext,
        analyses: &[Uid],
        options: &PartitionOptions,
    ) -> LimsResult<Sample> {
        let copier = FieldCopier::excluding(PARTITION_SKIP_FIELDS.iter().copied())
            .and_excluding(options.skip_fields.iter().cloned());
        let mut record = copier.to_record(parent);
        record.insert(
            fields::INTERNAL_USE.to_string(),
            Value::Bool(options.internal_use),
        );
        record.insert(
            fields::PARENT_ANALYSIS_REQUEST.to_string(),
            Value::String(parent.uid().to_string()),
        );
        options.sample_type.apply(&mut record, fields::SAMPLE_TYPE);
        options.container.apply(&mut record, fields::CONTAINER);
        options.preservation.apply(&mut record, fields::PRESERVATION);

        let client = parent
            .client_uid()
            .ok_or_else(|| LimsError::Validation(format!("Sample {} has no client", parent.id())))?;

        let mut seen = HashSet::new();
        let mut services = Vec::new();
        for uid in analyses {
            let analysis = parent
                .analysis(uid)
                .ok_or_else(|| LimsError::not_found("Analysis", uid))?;
            if seen.insert(uid) {
                services.push(ServiceRef::Analysis(analysis.clone()));
            }
        }

        let results_ranges = parent.results_ranges();
        let mut partition = self
            .register_sample(&client, request, &record, &services, &results_ranges, None)
            .await?;

        self.batcher
            .push(
                parent.uid(),
                DeferredAction::ReindexIndexes(vec![indexes::IS_ROOT_ANCESTOR.to_string()]),
            )
            .await;

        // The receive transition never ran on the partition, so the form
        // could not have set this
        partition.set_date_received(parent.date_received());
        self.batcher
            .push(
                partition.uid(),
                DeferredAction::ReindexIndexes(vec![indexes::DATE_RECEIVED.to_string()]),
            )
            .await;

        match parent.review_state() {
            Some(state) => {
                let state = state.to_string();
                self.driver
                    .force_state(
                        &mut partition,
                        &self.config.workflow.sample_workflow_id,
                        &state,
                        None,
                        "",
                        &request.actor,
                    )
                    .await?;
            }
            None => warn!(parent = %parent.id(), "Parent has no workflow state"),
        }
        if parent.has_marker(Marker::Received) {
            partition.mark(Marker::Received);
        }

        // Initialize guards need the received date set above
        self.batcher.enter_batch();
        let initialized = self
            .driver
            .do_action_to_analyses(&mut partition, Transition::Initialize)
            .await;
        self.batcher.resume_batch().await;
        initialized?;

        self.store.save_sample(&partition).await?;
        log_sample_operation("create_partition", partition.id(), "created", Some(parent.id()));
        self.publish(
            events::SAMPLE_PARTITION_CREATED,
            &partition,
            Some(json!({"parent": parent.uid().as_str()})),
        );
        Ok(partition)
    }

    /// Email the sample's contacts about its rejection. Returns `false`
    /// when nobody could be notified.
    pub async fn notify_rejection(&self, sample: &mut Sample) -> LimsResult<bool> {
        let notified = self.notifier.notify_rejection(sample).await?;
        if notified {
            self.publish(events::SAMPLE_REJECTION_NOTIFIED, sample, None);
        }
        Ok(notified)
    }

    fn enabled_assigner(&self) -> Option<&Arc<dyn AnalysisAssigner>> {
        self.assigner.as_ref().filter(|assigner| assigner.is_enabled())
    }

    /// The primary sample, when one is referenced and can be found
    async fn resolve_primary(&self, sample: &Sample) -> LimsResult<Option<Sample>> {
        let Some(primary_uid) = sample.primary_uid() else {
            return Ok(None);
        };
        let primary = self.store.get_sample(&primary_uid).await?;
        if primary.is_none() {
            warn!(sample = %sample.id(), primary = %primary_uid, "Primary sample not found");
        }
        Ok(primary)
    }

    /// Attach one analysis per service. Prices fall back to the service
    /// price; ranges are matched by keyword.
    async fn set_analyses(
        &self,
        sample: &mut Sample,
        service_uids: &[Uid],
        prices: Option<&ServicePrices>,
        results_ranges: &[ResultsRange],
    ) -> LimsResult<usize> {
        sample.merge_results_ranges(results_ranges);
        let ranges = sample.results_ranges();

        let mut added = 0;
        for uid in service_uids {
            let Some(service) = self.catalog.get_service(uid).await? else {
                warn!(service = %uid, "Analysis service not found");
                continue;
            };
            let price = prices
                .and_then(|prices| prices.get(uid))
                .copied()
                .unwrap_or(service.price);
            let range = ranges.iter().find(|range| range.keyword == service.keyword);

            let mut analysis = self.store.create_analysis(sample, &service.keyword).await?;
            analysis.apply_service(&service, price, range);
            let analysis_uid = analysis.uid().clone();
            if sample.add_analysis(analysis) {
                self.batcher.push(&analysis_uid, DeferredAction::Reindex).await;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Hide analyses whose service the sample's template or any of its
    /// profiles flags as hidden
    async fn apply_hidden_services(&self, sample: &mut Sample) -> LimsResult<usize> {
        let mut hidden = Vec::new();
        if let Some(template_uid) = sample.template_uid() {
            let template = self.catalog.get_template(&template_uid).await?;
            hidden.extend(get_hidden_service_uids(
                template.as_ref().map(|t| t as &dyn ServiceSettingsSource),
            ));
        }
        for profile_uid in sample.profile_uids() {
            let profile = self.catalog.get_profile(&profile_uid).await?;
            hidden.extend(get_hidden_service_uids(
                profile.as_ref().map(|p| p as &dyn ServiceSettingsSource),
            ));
        }

        let mut count = 0;
        for analysis in sample.analyses_mut() {
            if analysis
                .service_uid()
                .is_some_and(|uid| hidden.contains(&uid))
            {
                analysis.set_hidden(true);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Link a secondary sample to its primary. Returns `true` when the
    /// primary was already received and the secondary was received with it.
    async fn sync_with_primary(
        &self,
        sample: &mut Sample,
        primary: &Sample,
        request: &RequestContext,
        rejected: bool,
    ) -> LimsResult<bool> {
        sample.mark(Marker::Secondary);
        self.store.assign_permanent_id(sample).await?;

        sample.set_date_sampled(primary.date_sampled());
        sample.set_sampling_date(primary.sampling_date());
        sample.set_date_received(primary.date_received());

        if primary.date_received().is_none() {
            return Ok(false);
        }

        let comment = format!("Auto-received. Secondary Sample of {}", primary.id());
        self.driver
            .force_state(
                sample,
                &self.config.workflow.sample_workflow_id,
                SampleState::SampleReceived.as_str(),
                Some(Transition::Receive.as_str()),
                &comment,
                &request.actor,
            )
            .await?;
        sample.mark(Marker::Received);

        self.driver
            .do_action_to_analyses(sample, Transition::Initialize)
            .await?;
        self.publish(events::SAMPLE_MODIFIED, sample, None);
        self.batcher.push(sample.uid(), DeferredAction::Reindex).await;

        if rejected {
            self.driver
                .attempt_transition(sample, Transition::Reject)
                .await?;
        }
        Ok(true)
    }

    async fn build_retest(&self, source: &Sample, request: &RequestContext) -> LimsResult<Sample> {
        let container = source
            .client_uid()
            .ok_or_else(|| LimsError::Validation(format!("Sample {} has no client", source.id())))?;

        let temporary = temporary_id(&self.config.ids.temporary_id_prefix);
        let mut retest = self.store.create_sample(&container, &temporary).await?;
        FieldCopier::excluding(RETEST_SKIP_FIELDS.iter().copied()).copy(source, &mut retest);
        retest.mark(Marker::Retest);
        retest.set_invalidated(Some(source.uid()));
        self.store.assign_permanent_id(&mut retest).await?;

        let analysis_copier = FieldCopier::excluding(RETEST_ANALYSIS_SKIP_FIELDS.iter().copied());
        for analysis in source.analyses() {
            if is_intermediate_analysis_state(analysis.review_state()) {
                continue;
            }
            let mut copy = self.store.create_analysis(&retest, analysis.keyword()).await?;
            analysis_copier.copy(analysis, &mut copy);
            copy.set_kind(analysis.kind());
            let copy_uid = copy.uid().clone();
            if retest.add_analysis(copy) {
                self.batcher.push(&copy_uid, DeferredAction::Reindex).await;
            }
        }

        self.driver
            .force_state(
                &mut retest,
                &self.config.workflow.sample_workflow_id,
                SampleState::SampleReceived.as_str(),
                None,
                "",
                &request.actor,
            )
            .await?;
        retest.mark(Marker::Received);

        for analysis in retest.analyses_mut() {
            if !analysis.is_routine() {
                continue;
            }
            self.driver
                .force_state(
                    analysis,
                    &self.config.workflow.analysis_workflow_id,
                    AnalysisState::Unassigned.as_str(),
                    None,
                    "",
                    &request.actor,
                )
                .await?;
        }

        self.batcher.push(retest.uid(), DeferredAction::Reindex).await;
        self.batcher.push(&container, DeferredAction::Reindex).await;
        self.store.save_sample(&retest).await?;
        Ok(retest)
    }

    async fn finish_creation(&self, sample: Sample) -> LimsResult<Sample> {
        self.store.save_sample(&sample).await?;
        info!(
            sample = %sample.id(),
            state = sample.review_state().unwrap_or("none"),
            analyses = sample.analyses().len(),
            "Sample created"
        );
        self.publish(events::SAMPLE_CREATED, &sample, None);
        Ok(sample)
    }

    fn publish(&self, event_name: &str, sample: &Sample, extra: Option<Value>) {
        let observers = self
            .event_publisher
            .publish_sample_event(event_name, sample, extra);
        debug!(event = event_name, sample = %sample.id(), observers, "Published event");
    }
}
