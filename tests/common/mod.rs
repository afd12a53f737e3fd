//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use lims_core::models::{AnalysisService, Content, FieldValues, RequestContext, Sample, Uid};
use lims_core::state_machine::{SampleState, TransitionRecord};
use lims_core::test_helpers::TestPortal;
use lims_core::SampleOrchestrator;
use serde_json::{json, Value};

/// Calcium, Magnesium and Iron services registered in the portal's catalog
pub struct Services {
    pub calcium: AnalysisService,
    pub magnesium: AnalysisService,
    pub iron: AnalysisService,
}

pub fn register_services(portal: &TestPortal) -> Services {
    let services = Services {
        calcium: AnalysisService::new("Ca", "Calcium").with_price(10.0),
        magnesium: AnalysisService::new("Mg", "Magnesium").with_price(12.5),
        iron: AnalysisService::new("Fe", "Iron").with_price(8.0),
    };
    for service in [&services.calcium, &services.magnesium, &services.iron] {
        portal.catalog.add_service(service.clone());
    }
    services
}

pub fn values(entries: &[(&str, Value)]) -> FieldValues {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn request() -> RequestContext {
    RequestContext::new("labman")
}

/// Create a sample with the given services and receive it through the
/// workflow, the way the laboratory would
pub async fn received_sample(
    portal: &TestPortal,
    orchestrator: &SampleOrchestrator,
    services: &[&AnalysisService],
) -> Sample {
    let refs: Vec<_> = services.iter().map(|s| s.keyword.as_str().into()).collect();
    let mut sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[("DateSampled", json!("2024-03-01T08:00:00+00:00"))]),
            &refs,
            &[],
            None,
        )
        .await
        .unwrap();

    sample.set_date_received(Some(chrono::Utc::now()));
    let driver = lims_core::WorkflowDriver::new(portal.engine.clone(), orchestrator.batcher().clone());
    let outcome = driver
        .attempt_transition(&mut sample, lims_core::Transition::Receive)
        .await
        .unwrap();
    assert!(outcome.is_success(), "receive failed: {}", outcome.message());
    sample.mark(lims_core::models::Marker::Received);
    driver
        .do_action_to_analyses(&mut sample, lims_core::Transition::Initialize)
        .await
        .unwrap();
    assert_eq!(
        sample.review_state(),
        Some(SampleState::SampleReceived.as_str())
    );
    portal.store.insert_sample(sample.clone());
    sample
}

pub fn uid_value(uid: &Uid) -> Value {
    json!(uid.as_str())
}

/// Record a state change the orchestrator never performs itself, such as
/// invalidation or retraction
pub fn record_state(object: &mut dyn Content, workflow_id: &str, action: &str, state: &str) {
    object.workflow_history_mut().push(TransitionRecord::new(
        workflow_id,
        Some(action),
        state,
        "labman",
        "",
    ));
}
