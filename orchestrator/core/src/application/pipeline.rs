// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Triage Pipeline
//!
//! Wires the five workers onto one [`SwarmCoordinator`]:
//!
//! | Worker | Behavior | Matches |
//! |--------|----------|---------|
//! | Gateway | none (intake adapter) | n/a |
//! | Classifier | `classify-intake` | REQUEST from the Gateway |
//! | Judge | `judge-assessment` (+ one reply waiter per CRITICAL patient) | INFORM from the Classifier |
//! | Judge | `drain-late-replies` | INFORM/FAILURE for an untracked correlation |
//! | Explainer | `explain-risk` | REQUEST from anyone |
//! | Notifier | `deliver-notification` | anything |
//!
//! When `correlation.reply_timeout_seconds` is set, a sweeper task expires
//! explanation requests that stayed unanswered longer than that.

use crate::application::classifier::Classifier;
use crate::application::explainer::Explainer;
use crate::application::gateway::Gateway;
use crate::application::judge::{Judge, LateReplyDrain};
use crate::application::notifier::Notifier;
use crate::domain::events::PipelineEvent;
use crate::domain::llm::LLMProvider;
use crate::domain::node_config::TriageConfigSpec;
use crate::domain::scoring::RiskScoringService;
use crate::domain::storage::ExplanationStore;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::llm::build_provider;
use crate::infrastructure::prompt_template_engine::ExplanationPromptBuilder;
use crate::infrastructure::scoring_client::HttpRiskScoringClient;
use crate::infrastructure::storage_client::build_store;
use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use triage_swarm::{CorrelationRegistry, SwarmCoordinator};

/// External services the workers call.
#[derive(Clone)]
pub struct PipelineCollaborators {
    pub scoring: Arc<dyn RiskScoringService>,
    pub generator: Arc<dyn LLMProvider>,
    pub store: Arc<dyn ExplanationStore>,
}

impl PipelineCollaborators {
    /// HTTP clients for the endpoints in the manifest.
    pub fn from_config(spec: &TriageConfigSpec) -> anyhow::Result<Self> {
        let scoring = HttpRiskScoringClient::from_config(&spec.scoring)
            .context("Failed to create risk scoring client")?;
        let generator =
            build_provider(&spec.generation).context("Failed to create text generation provider")?;
        let store = build_store(&spec.storage).context("Failed to create explanation store")?;

        Ok(Self {
            scoring: Arc::new(scoring),
            generator,
            store,
        })
    }
}

pub struct TriagePipeline {
    coordinator: SwarmCoordinator,
    gateway: Gateway,
    generator: Arc<dyn LLMProvider>,
    events: EventBus,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl TriagePipeline {
    /// Register and spawn all workers. Must be called inside a tokio runtime.
    pub fn start(spec: &TriageConfigSpec, collaborators: PipelineCollaborators) -> anyhow::Result<Self> {
        let workers = &spec.workers;
        let events = EventBus::with_default_capacity();
        let coordinator = SwarmCoordinator::with_idle_backoff(spec.scheduler.idle_backoff());

        let gateway_worker = coordinator.register_worker(workers.gateway_id())?;
        let mut classifier = coordinator.register_worker(workers.classifier_id())?;
        let mut judge = coordinator.register_worker(workers.judge_id())?;
        let mut explainer = coordinator.register_worker(workers.explainer_id())?;
        let mut notifier = coordinator.register_worker(workers.notifier_id())?;

        classifier.add_behavior(
            Classifier::new(collaborators.scoring, workers.judge_id(), events.clone())
                .into_behavior(workers.gateway_id()),
        );
        judge.add_behavior(
            Judge::new(workers.explainer_id(), workers.notifier_id(), events.clone())
                .into_behavior(workers.classifier_id()),
        );
        judge.add_behavior(LateReplyDrain::new(events.clone()));
        let generator = collaborators.generator;
        explainer.add_behavior(
            Explainer::new(
                generator.clone(),
                spec.generation.options(),
                ExplanationPromptBuilder::new()?,
                collaborators.store,
            )
            .into_behavior(),
        );
        notifier.add_behavior(Notifier::new(events.clone()).into_behavior());

        for worker in [gateway_worker, classifier, judge, explainer, notifier] {
            coordinator.spawn(worker);
        }

        let gateway = Gateway::new(
            workers.gateway_id(),
            workers.classifier_id(),
            workers.notifier_id(),
            coordinator.clone(),
            events.clone(),
        );

        let sweeper = spec.correlation.reply_timeout().map(|timeout| {
            spawn_sweeper(
                coordinator.correlations().clone(),
                events.clone(),
                timeout,
                spec.correlation.sweep_interval(),
                coordinator.shutdown_token().child_token(),
            )
        });

        info!(
            workers = ?coordinator.workers(),
            reply_timeout_secs = ?spec.correlation.reply_timeout_seconds,
            "Triage pipeline started"
        );

        Ok(Self {
            coordinator,
            gateway,
            generator,
            events,
            sweeper: Mutex::new(sweeper),
        })
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn correlations(&self) -> &Arc<CorrelationRegistry> {
        self.coordinator.correlations()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The text-generation provider the Explainer calls.
    pub fn generator(&self) -> &Arc<dyn LLMProvider> {
        &self.generator
    }

    pub fn coordinator(&self) -> &SwarmCoordinator {
        &self.coordinator
    }

    /// Stop every worker and the sweeper, and wait for them to exit.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            if let Err(e) = sweeper.await {
                warn!(error = %e, "Correlation sweeper ended abnormally");
            }
        }
        info!(
            pending_correlations = self.correlations().pending_count(),
            "Triage pipeline stopped"
        );
    }
}

fn spawn_sweeper(
    registry: Arc<CorrelationRegistry>,
    events: EventBus,
    timeout: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for entry in registry.expire_older_than(timeout) {
                metrics::counter!("triage_explanations_total", "outcome" => "expired").increment(1);
                events.publish(PipelineEvent::CorrelationExpired {
                    correlation_id: entry.correlation_id,
                    expected_replier: entry.expected_replier,
                    expired_at: Utc::now(),
                });
            }
        }
    })
}
