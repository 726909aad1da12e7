// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

mod common;

use common::{collect_until, RecordingStore, StubGenerator, StubScoring};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use triage_core::domain::events::PipelineEvent;
use triage_core::domain::llm::LLMError;
use triage_core::domain::node_config::TriageConfigSpec;
use triage_core::domain::scoring::ScoringError;
use triage_core::domain::severity::SeverityTier;
use triage_swarm::WorkerId;

const WAIT: Duration = Duration::from_secs(5);

fn is_fulfilled(event: &PipelineEvent) -> bool {
    matches!(event, PipelineEvent::CorrelationFulfilled { .. })
}

#[tokio::test]
async fn test_critical_patient_round_trip() {
    let spec = TriageConfigSpec::default();
    let scoring = StubScoring::critical();
    let generator = StubGenerator::returning("explanation text");
    let store = RecordingStore::ok();
    let pipeline = common::start(&spec, scoring.clone(), generator.clone(), store.clone());
    let mut events = pipeline.events().subscribe();

    pipeline
        .gateway()
        .submit(br#"{"user_id":"p1","bmi":31}"#)
        .unwrap();

    let seen = collect_until(&mut events, WAIT, is_fulfilled).await;

    assert!(seen.iter().any(|e| matches!(
        e,
        PipelineEvent::TierAssigned { tier: SeverityTier::Critical, user_id: Some(u), .. } if u == "p1"
    )));
    let requested = seen
        .iter()
        .find_map(|e| match e {
            PipelineEvent::ExplanationRequested { correlation_id, .. } => Some(correlation_id.clone()),
            _ => None,
        })
        .expect("explanation was requested");
    assert!(seen.iter().any(|e| matches!(
        e,
        PipelineEvent::ExplanationReceived { explanation, correlation_id, .. }
            if explanation == "explanation text" && *correlation_id == requested
    )));
    match seen.last() {
        Some(PipelineEvent::CorrelationFulfilled { correlation_id, replier, .. }) => {
            assert_eq!(*correlation_id, requested);
            assert_eq!(*replier, WorkerId::from("explainer"));
        }
        other => panic!("unexpected last event {:?}", other),
    }

    // entry is discarded once fulfilled
    assert_eq!(pipeline.correlations().pending_count(), 0);
    assert!(pipeline.correlations().get(&requested).is_none());

    // scoring saw the raw intake; generation saw the prompt for p1
    assert_eq!(scoring.calls.lock()[0], json!({"user_id": "p1", "bmi": 31}));
    assert!(generator.prompts.lock()[0].contains("- ID: p1"));
    assert_eq!(
        store.stored.lock().clone(),
        vec![("p1".to_string(), "explanation text".to_string())]
    );

    let is_alert = |e: &PipelineEvent| {
        matches!(e, PipelineEvent::NotificationDelivered { content, .. } if content.contains("ALERTA CRÍTICO"))
    };
    if !seen.iter().any(is_alert) {
        collect_until(&mut events, WAIT, is_alert).await;
    }

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_scoring_failure_creates_no_correlation() {
    let spec = TriageConfigSpec::default();
    let pipeline = common::start(
        &spec,
        StubScoring::failing(ScoringError::Unavailable("connection refused".into())),
        StubGenerator::returning("unused"),
        RecordingStore::ok(),
    );
    let mut events = pipeline.events().subscribe();

    pipeline
        .gateway()
        .submit(br#"{"user_id":"p1","bmi":31}"#)
        .unwrap();

    collect_until(&mut events, WAIT, |e| {
        matches!(e, PipelineEvent::ScoringFailed { error, .. } if error.contains("connection refused"))
    })
    .await;

    // give the judge a chance to (wrongly) act
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(
                event,
                PipelineEvent::TierAssigned { .. } | PipelineEvent::ExplanationRequested { .. }
            ),
            "judge acted on a dropped request: {:?}",
            event
        );
    }
    assert_eq!(pipeline.correlations().pending_count(), 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_same_payload_twice_runs_twice() {
    let spec = TriageConfigSpec::default();
    let pipeline = common::start(
        &spec,
        StubScoring::critical(),
        StubGenerator::returning("explanation text"),
        RecordingStore::ok(),
    );
    let mut events = pipeline.events().subscribe();

    let payload = br#"{"user_id":"p1","bmi":31}"#;
    pipeline.gateway().submit(payload).unwrap();
    pipeline.gateway().submit(payload).unwrap();

    let mut fulfilled = HashSet::new();
    let mut requested = HashSet::new();
    let seen = collect_until(&mut events, WAIT, {
        let counter = std::cell::Cell::new(0);
        move |e| {
            if is_fulfilled(e) {
                counter.set(counter.get() + 1);
            }
            counter.get() == 2
        }
    })
    .await;

    for event in &seen {
        match event {
            PipelineEvent::ExplanationRequested { correlation_id, .. } => {
                requested.insert(correlation_id.clone());
            }
            PipelineEvent::CorrelationFulfilled { correlation_id, .. } => {
                fulfilled.insert(correlation_id.clone());
            }
            _ => {}
        }
    }

    assert_eq!(requested.len(), 2, "two independent correlation ids");
    assert_eq!(requested, fulfilled);
    assert_eq!(pipeline.correlations().pending_count(), 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_non_critical_tier_stays_local() {
    let spec = TriageConfigSpec::default();
    let generator = StubGenerator::returning("unused");
    let pipeline = common::start(
        &spec,
        StubScoring::returning(json!({"user_id": "p2", "chronic_risk_score": 0.45})),
        generator.clone(),
        RecordingStore::ok(),
    );
    let mut events = pipeline.events().subscribe();

    pipeline.gateway().submit(br#"{"user_id":"p2"}"#).unwrap();

    let seen = collect_until(&mut events, WAIT, |e| {
        matches!(e, PipelineEvent::TierAssigned { .. })
    })
    .await;
    match seen.last() {
        Some(PipelineEvent::TierAssigned { tier, actions, .. }) => {
            assert_eq!(*tier, SeverityTier::Medium);
            assert_eq!(actions.len(), 4);
        }
        other => panic!("unexpected event {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, PipelineEvent::ExplanationRequested { .. }));
    }
    assert!(generator.prompts.lock().is_empty());
    assert_eq!(pipeline.correlations().pending_count(), 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_generation_failure_replies_failure() {
    let spec = TriageConfigSpec::default();
    let store = RecordingStore::ok();
    let pipeline = common::start(
        &spec,
        StubScoring::critical(),
        StubGenerator::failing(LLMError::Timeout(60)),
        store.clone(),
    );
    let mut events = pipeline.events().subscribe();

    pipeline
        .gateway()
        .submit(br#"{"user_id":"p1","bmi":31}"#)
        .unwrap();

    let seen = collect_until(&mut events, WAIT, is_fulfilled).await;
    assert!(seen.iter().any(|e| matches!(
        e,
        PipelineEvent::ExplanationFailed { reason, .. } if reason.contains("timed out")
    )));
    assert!(!seen
        .iter()
        .any(|e| matches!(e, PipelineEvent::ExplanationReceived { .. })));
    assert!(store.stored.lock().is_empty());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_storage_failure_still_informs() {
    let spec = TriageConfigSpec::default();
    let pipeline = common::start(
        &spec,
        StubScoring::critical(),
        StubGenerator::returning("explanation text"),
        RecordingStore::failing(),
    );
    let mut events = pipeline.events().subscribe();

    pipeline
        .gateway()
        .submit(br#"{"user_id":"p1","bmi":31}"#)
        .unwrap();

    let seen = collect_until(&mut events, WAIT, is_fulfilled).await;
    assert!(seen.iter().any(|e| matches!(
        e,
        PipelineEvent::ExplanationReceived { explanation, .. } if explanation == "explanation text"
    )));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_unanswered_request_is_expired_by_sweeper() {
    let mut spec = TriageConfigSpec::default();
    spec.correlation.reply_timeout_seconds = Some(1);
    spec.correlation.sweep_interval_seconds = Some(1);

    let pipeline = common::start(
        &spec,
        StubScoring::critical(),
        StubGenerator::slow("too late", Duration::from_secs(4)),
        RecordingStore::ok(),
    );
    let mut events = pipeline.events().subscribe();

    pipeline
        .gateway()
        .submit(br#"{"user_id":"p1","bmi":31}"#)
        .unwrap();

    let seen = collect_until(&mut events, WAIT, |e| {
        matches!(e, PipelineEvent::CorrelationExpired { .. })
    })
    .await;
    let expired_id = match seen.last() {
        Some(PipelineEvent::CorrelationExpired { correlation_id, expected_replier, .. }) => {
            assert_eq!(*expected_replier, WorkerId::from("explainer"));
            correlation_id.clone()
        }
        other => panic!("unexpected event {:?}", other),
    };
    assert_eq!(pipeline.correlations().pending_count(), 0);

    // the explainer answers after the expiry; the judge discards the reply
    let rest = collect_until(&mut events, WAIT, |e| {
        matches!(e, PipelineEvent::LateReplyDiscarded { .. })
    })
    .await;
    match rest.last() {
        Some(PipelineEvent::LateReplyDiscarded { correlation_id, sender, .. }) => {
            assert_eq!(*correlation_id, expired_id);
            assert_eq!(*sender, WorkerId::from("explainer"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(!rest.iter().any(|e| matches!(
        e,
        PipelineEvent::ExplanationReceived { .. } | PipelineEvent::CorrelationFulfilled { .. }
    )));

    let judge = pipeline
        .coordinator()
        .handle(&WorkerId::from("judge"))
        .unwrap();
    assert!(judge.mailbox().is_empty(), "late reply left in the mailbox");

    pipeline.shutdown().await;
}
