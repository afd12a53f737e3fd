//! Sample creation: primary samples, secondary samples, queued analysis
//! assignment, hidden services and automatic rejection.

mod common;

use common::*;
use lims_core::constants::{events, fields};
use lims_core::models::{Content, Marker, Profile, ResultsRange, SampleTemplate, ServiceSetting};
use lims_core::portal::ServicePrices;
use lims_core::state_machine::SampleState;
use lims_core::test_helpers::{RecordingAnalysisAssigner, ScriptedWorkflowEngine, TestPortal};
use lims_core::{EventPublisher, ServiceRef};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn primary_sample_without_sampling_workflow_is_due() {
    let portal = TestPortal::new();
    let services = register_services(&portal);
    let orchestrator = portal.orchestrator();

    let sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[("Remarks", json!("fragile"))]),
            &["Ca".into(), ServiceRef::from(services.magnesium.clone())],
            &[],
            None,
        )
        .await
        .unwrap();

    assert_eq!(sample.review_state(), Some(SampleState::SampleDue.as_str()));
    assert_eq!(sample.get_field("Remarks"), Some(&json!("fragile")));
    let keywords: Vec<_> = sample.analyses().iter().map(|a| a.keyword()).collect();
    assert_eq!(keywords, vec!["Ca", "Mg"]);
    assert_eq!(
        portal.engine.attempted_on(sample.uid()),
        vec!["no_sampling_workflow"]
    );
}

#[tokio::test]
async fn sampling_workflow_falls_back_to_to_be_sampled() {
    let portal = TestPortal::with_engine(ScriptedWorkflowEngine::new().with_sampling_workflow(true));
    register_services(&portal);
    let orchestrator = portal.orchestrator();

    let sample = orchestrator
        .create_sample(&portal.client, &request(), &values(&[]), &["Fe".into()], &[], None)
        .await
        .unwrap();

    assert_eq!(sample.review_state(), Some(SampleState::ToBeSampled.as_str()));
    assert_eq!(
        portal.engine.attempted_on(sample.uid()),
        vec!["no_sampling_workflow", "to_be_sampled"]
    );
}

#[tokio::test]
async fn analyses_take_prices_and_ranges() {
    let portal = TestPortal::new();
    let services = register_services(&portal);
    let orchestrator = portal.orchestrator();

    let mut prices = ServicePrices::new();
    prices.insert(services.calcium.uid.clone(), 99.0);
    let ranges = vec![ResultsRange::new("Mg", "1", "5")];

    let sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[("Analyses", json!(["Ca", "Magnesium"]))]),
            &[],
            &ranges,
            Some(&prices),
        )
        .await
        .unwrap();

    let calcium = &sample.analyses()[0];
    let magnesium = &sample.analyses()[1];
    assert_eq!(calcium.price(), Some(99.0));
    assert_eq!(magnesium.price(), Some(12.5));
    assert_eq!(magnesium.results_range(), Some(ranges[0].clone()));
    assert_eq!(calcium.results_range(), None);
    assert_eq!(sample.results_ranges(), ranges);
    // Analyses never go through the form
    assert_eq!(sample.get_field(fields::ANALYSES), Some(&json!([])));
}

#[tokio::test]
async fn enabled_assigner_queues_instead_of_attaching() {
    let portal = TestPortal::new();
    let services = register_services(&portal);
    let assigner = Arc::new(RecordingAnalysisAssigner::new(true));
    let orchestrator = portal.orchestrator().with_async_assigner(assigner.clone());
    let ranges = vec![ResultsRange::new("Ca", "0", "1")];

    let sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[]),
            &["Ca".into(), "Fe".into()],
            &ranges,
            None,
        )
        .await
        .unwrap();

    assert!(sample.analyses().is_empty());
    let queued = assigner.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].sample, *sample.uid());
    assert_eq!(queued[0].actor, "labman");
    assert_eq!(queued[0].services, vec![services.calcium.uid, services.iron.uid]);
    assert_eq!(queued[0].ranges, ranges);
    assert_eq!(sample.review_state(), Some(SampleState::SampleDue.as_str()));
}

#[tokio::test]
async fn disabled_assigner_is_ignored() {
    let portal = TestPortal::new();
    register_services(&portal);
    let assigner = Arc::new(RecordingAnalysisAssigner::new(false));
    let orchestrator = portal.orchestrator().with_async_assigner(assigner.clone());

    let sample = orchestrator
        .create_sample(&portal.client, &request(), &values(&[]), &["Ca".into()], &[], None)
        .await
        .unwrap();

    assert!(assigner.queued().is_empty());
    assert_eq!(sample.analyses().len(), 1);
}

#[tokio::test]
async fn template_and_profile_hide_services() {
    let portal = TestPortal::new();
    let services = register_services(&portal);

    let template = SampleTemplate {
        uid: lims_core::Uid::generate(),
        title: "Routine water".to_string(),
        settings: vec![ServiceSetting {
            uid: services.calcium.uid.clone(),
            hidden: true,
        }],
    };
    let mut profile = Profile::new("Metals", vec![services.iron.uid.clone()]);
    profile.settings.push(ServiceSetting {
        uid: services.iron.uid.clone(),
        hidden: true,
    });
    portal.catalog.add_template(template.clone());
    portal.catalog.add_profile(profile.clone());
    let orchestrator = portal.orchestrator();

    let sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[
                ("Template", uid_value(&template.uid)),
                ("Profiles", json!([profile.uid.as_str()])),
            ]),
            &["Ca".into(), "Mg".into()],
            &[],
            None,
        )
        .await
        .unwrap();

    let hidden: Vec<_> = sample
        .analyses()
        .iter()
        .map(|a| (a.keyword().to_string(), a.is_hidden()))
        .collect();
    assert_eq!(
        hidden,
        vec![
            ("Ca".to_string(), true),
            ("Mg".to_string(), false),
            ("Fe".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn rejection_reasons_reject_the_new_sample() {
    let portal = TestPortal::new();
    register_services(&portal);
    let orchestrator = portal.orchestrator();

    let sample = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[
                (
                    "RejectionReasons",
                    json!([{"checkbox": "on", "multiselection": ["Broken container"]}]),
                ),
                ("RejectionReasons.textfield", json!([{"other": "Leaking"}])),
            ]),
            &["Ca".into()],
            &[],
            None,
        )
        .await
        .unwrap();

    let reasons = sample.rejection_reasons();
    assert_eq!(reasons.len(), 1);
    assert_eq!(reasons[0].selected, vec!["Broken container"]);
    assert_eq!(reasons[0].other, "Leaking");
    assert_eq!(sample.review_state(), Some(SampleState::Rejected.as_str()));
}

#[tokio::test]
async fn secondary_of_received_primary_is_received_synchronously() {
    let portal = TestPortal::new();
    let services = register_services(&portal);
    let orchestrator = portal.orchestrator();
    let primary = received_sample(&portal, &orchestrator, &[&services.calcium]).await;

    let secondary = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[("PrimaryAnalysisRequest", uid_value(primary.uid()))]),
            &["Mg".into()],
            &[],
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        secondary.review_state(),
        Some(SampleState::SampleReceived.as_str())
    );
    assert!(secondary.has_marker(Marker::Secondary));
    assert!(secondary.has_marker(Marker::Received));
    assert_eq!(secondary.date_received(), primary.date_received());
    assert_eq!(secondary.date_sampled(), primary.date_sampled());
    // Neither sampling transition was attempted
    assert!(portal.engine.attempted_on(secondary.uid()).is_empty());

    let record = secondary.workflow_history().last().unwrap();
    assert_eq!(record.action.as_deref(), Some("receive"));
    assert_eq!(
        record.comments,
        format!("Auto-received. Secondary Sample of {}", primary.id())
    );
}

#[tokio::test]
async fn secondary_of_received_primary_with_reasons_is_rejected() {
    let portal = TestPortal::new();
    let services = register_services(&portal);
    let orchestrator = portal.orchestrator();
    let primary = received_sample(&portal, &orchestrator, &[&services.calcium]).await;

    let secondary = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[
                ("PrimaryAnalysisRequest", uid_value(primary.uid())),
                ("RejectionReasons.textfield", json!([{"other": "Mislabelled"}])),
            ]),
            &[],
            &[],
            None,
        )
        .await
        .unwrap();

    assert_eq!(secondary.review_state(), Some(SampleState::Rejected.as_str()));
    assert_eq!(portal.engine.attempted_on(secondary.uid()), vec!["reject"]);
}

#[tokio::test]
async fn secondary_of_unreceived_primary_follows_primary_path() {
    let portal = TestPortal::new();
    register_services(&portal);
    let orchestrator = portal.orchestrator();
    let primary = orchestrator
        .create_sample(&portal.client, &request(), &values(&[]), &["Ca".into()], &[], None)
        .await
        .unwrap();

    let secondary = orchestrator
        .create_sample(
            &portal.client,
            &request(),
            &values(&[("PrimaryAnalysisRequest", uid_value(primary.uid()))]),
            &["Mg".into()],
            &[],
            None,
        )
        .await
        .unwrap();

    assert!(secondary.has_marker(Marker::Secondary));
    assert!(!secondary.has_marker(Marker::Received));
    assert_eq!(secondary.review_state(), Some(SampleState::SampleDue.as_str()));
    // Analyses are only attached for samples without a primary
    assert!(secondary.analyses().is_empty());
}

#[tokio::test]
async fn creation_publishes_event() {
    let portal = TestPortal::new();
    let publisher = EventPublisher::new(16);
    let mut receiver = publisher.subscribe();
    let orchestrator = portal.orchestrator().with_event_publisher(publisher);

    let sample = orchestrator
        .create_sample(&portal.client, &request(), &values(&[]), &[], &[], None)
        .await
        .unwrap();

    let event = receiver.recv().await.unwrap();
    assert_eq!(event.name, events::SAMPLE_CREATED);
    assert_eq!(event.context["uid"], json!(sample.uid().as_str()));
    assert_eq!(event.context["review_state"], json!("sample_due"));
}
