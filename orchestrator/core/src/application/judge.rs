// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Judge worker.
//!
//! Matches INFORM messages from the Classifier, assigns a [`SeverityTier`]
//! and carries out the tier's follow-up actions. Only CRITICAL patients are
//! dispatched further:
//!
//! 1. a correlation id is registered for the Explainer,
//! 2. a [`ReplyWaiter`] for that id is scheduled on this worker,
//! 3. the REQUEST goes to the Explainer,
//! 4. an INFORM alert goes to the Notifier.
//!
//! Registration happens before the send, so a fast reply always finds its
//! entry. A failed send expires the correlation, which also cancels the
//! waiter.
//!
//! Replies that arrive after their correlation was expired or fulfilled have
//! no waiter left to read them. [`LateReplyDrain`] takes those out of the
//! mailbox so a long-running node does not accumulate them.

use crate::domain::events::PipelineEvent;
use crate::domain::patient::RiskAssessment;
use crate::domain::severity::{route_for, SeverityTier};
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use triage_swarm::{
    Behavior, BehaviorStatus, CorrelationId, CyclicBehavior, Message, MessageHandler,
    PatternTemplate, Performative, ReplyWaiter, WorkerContext, WorkerId,
};

pub struct Judge {
    explainer: WorkerId,
    notifier: WorkerId,
    events: EventBus,
}

impl Judge {
    pub fn new(explainer: WorkerId, notifier: WorkerId, events: EventBus) -> Self {
        Self {
            explainer,
            notifier,
            events,
        }
    }

    /// Cyclic behavior accepting results from `classifier` only.
    pub fn into_behavior(self, classifier: WorkerId) -> CyclicBehavior<Self> {
        CyclicBehavior::new(
            "judge-assessment",
            PatternTemplate::any()
                .performative(Performative::Inform)
                .sender(classifier),
            self,
        )
    }

    fn log_assessment(&self, ctx: &WorkerContext, assessment: &RiskAssessment, tier: SeverityTier) {
        info!(
            worker = %ctx.worker_id(),
            user_id = assessment.user_id_or_unknown(),
            chronic_risk_score = assessment.chronic_risk_score,
            risk_level = assessment.risk_level.as_deref().unwrap_or("-"),
            risk_prediction = ?assessment.risk_prediction,
            tier = %tier,
            "Patient classified"
        );

        if let Some(features) = &assessment.clinical_features {
            info!(
                worker = %ctx.worker_id(),
                user_id = assessment.user_id_or_unknown(),
                bmi = %display_field(features, "bmi"),
                bmi_category = %display_field(features, "bmi_category"),
                blood_pressure_category = %display_field(features, "blood_pressure_category"),
                age_category = %display_field(features, "age_category"),
                "Clinical features"
            );
        }
        if let Some(overall) = assessment.overall_interpretation() {
            info!(
                worker = %ctx.worker_id(),
                user_id = assessment.user_id_or_unknown(),
                interpretation = overall,
                "Clinical interpretation"
            );
        }
    }

    fn request_explanation(&self, ctx: &WorkerContext, request: &Message, assessment: &RiskAssessment) {
        let correlation_id = CorrelationId::generate("explanation");
        let registry = ctx.correlations();

        if let Err(e) = registry.register(correlation_id.clone(), self.explainer.clone()) {
            error!(worker = %ctx.worker_id(), error = %e, "Could not register explanation request");
            return;
        }

        let waiter = ReplyWaiter::new(
            correlation_id.clone(),
            self.explainer.clone(),
            ExplanationReply {
                user_id: assessment.user_id.clone(),
                correlation_id: correlation_id.clone(),
                events: self.events.clone(),
            },
        );
        let handle = ctx.add_behavior(waiter);
        if let Err(e) = registry.attach_waiter(&correlation_id, handle.clone()) {
            // only possible if the entry vanished in between
            warn!(worker = %ctx.worker_id(), error = %e, "Correlation gone before waiter attached");
            handle.cancel();
            return;
        }

        let message = Message::request(
            ctx.worker_id().clone(),
            self.explainer.clone(),
            request.payload().clone(),
        )
        .with_correlation_id(correlation_id.clone());

        if let Err(e) = ctx.send(message) {
            error!(
                worker = %ctx.worker_id(),
                correlation_id = %correlation_id,
                error = %e,
                "Explanation request not delivered, expiring correlation"
            );
            registry.expire(&correlation_id);
            return;
        }

        info!(
            worker = %ctx.worker_id(),
            user_id = assessment.user_id_or_unknown(),
            correlation_id = %correlation_id,
            explainer = %self.explainer,
            "Explanation requested"
        );
        self.events.publish(PipelineEvent::ExplanationRequested {
            user_id: assessment.user_id.clone(),
            correlation_id,
            requested_at: Utc::now(),
        });
    }

    fn alert_notifier(&self, ctx: &WorkerContext, assessment: &RiskAssessment, tier: SeverityTier) {
        let text = format!(
            "ALERTA CRÍTICO: paciente {} com score de risco {:.2} ({})",
            assessment.user_id_or_unknown(),
            assessment.chronic_risk_score,
            tier
        );
        let message = Message::inform(ctx.worker_id().clone(), self.notifier.clone(), text);
        if let Err(e) = ctx.send(message) {
            warn!(worker = %ctx.worker_id(), error = %e, "Critical alert not delivered");
        }
    }
}

fn display_field(object: &Value, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl MessageHandler for Judge {
    async fn handle(&mut self, message: Message, ctx: &WorkerContext) {
        let assessment = match RiskAssessment::from_slice(message.payload()) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(
                    worker = %ctx.worker_id(),
                    sender = %message.sender(),
                    error = %e,
                    "Ignoring unreadable assessment"
                );
                return;
            }
        };

        let tier = assessment.tier();
        let decision = route_for(tier);
        self.log_assessment(ctx, &assessment, tier);
        metrics::counter!("triage_tier_assigned_total", "tier" => tier.as_str()).increment(1);

        for action in &decision.actions {
            info!(
                worker = %ctx.worker_id(),
                user_id = assessment.user_id_or_unknown(),
                tier = %tier,
                action = %action,
                "Follow-up action"
            );
        }

        self.events.publish(PipelineEvent::TierAssigned {
            user_id: assessment.user_id.clone(),
            tier,
            chronic_risk_score: assessment.chronic_risk_score,
            actions: decision.actions.clone(),
            assigned_at: Utc::now(),
        });

        if decision.request_explanation {
            self.request_explanation(ctx, &message, &assessment);
        }
        if decision.alert_notifier {
            self.alert_notifier(ctx, &assessment, tier);
        }
    }
}

/// Runs once, when the Explainer's reply for one correlation arrives.
pub struct ExplanationReply {
    user_id: Option<String>,
    correlation_id: CorrelationId,
    events: EventBus,
}

#[async_trait]
impl MessageHandler for ExplanationReply {
    async fn handle(&mut self, reply: Message, ctx: &WorkerContext) {
        let body = String::from_utf8_lossy(reply.payload()).into_owned();

        match reply.performative() {
            Performative::Inform => {
                info!(
                    worker = %ctx.worker_id(),
                    user_id = self.user_id.as_deref().unwrap_or("unknown"),
                    correlation_id = %self.correlation_id,
                    explanation = %body,
                    "Explanation received"
                );
                self.events.publish(PipelineEvent::ExplanationReceived {
                    user_id: self.user_id.clone(),
                    correlation_id: self.correlation_id.clone(),
                    explanation: body,
                    received_at: Utc::now(),
                });
            }
            Performative::Failure | Performative::Request => {
                warn!(
                    worker = %ctx.worker_id(),
                    user_id = self.user_id.as_deref().unwrap_or("unknown"),
                    correlation_id = %self.correlation_id,
                    performative = %reply.performative(),
                    reason = %body,
                    "Explanation could not be obtained"
                );
                self.events.publish(PipelineEvent::ExplanationFailed {
                    user_id: self.user_id.clone(),
                    correlation_id: self.correlation_id.clone(),
                    reason: body,
                    failed_at: Utc::now(),
                });
            }
        }

        self.events.publish(PipelineEvent::CorrelationFulfilled {
            correlation_id: self.correlation_id.clone(),
            replier: reply.sender().clone(),
            fulfilled_at: Utc::now(),
        });
    }
}

/// Discards INFORM/FAILURE replies whose correlation id the registry no
/// longer tracks.
///
/// Messages without a correlation id, and replies for correlations that are
/// still pending (including ones from an unexpected sender), are left alone.
pub struct LateReplyDrain {
    events: EventBus,
}

impl LateReplyDrain {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl Behavior for LateReplyDrain {
    fn name(&self) -> &str {
        "drain-late-replies"
    }

    async fn action(&mut self, ctx: &WorkerContext) -> BehaviorStatus {
        let registry = ctx.correlations();
        let stale = ctx.mailbox().try_match_where(|message| {
            matches!(message.performative(), Performative::Inform | Performative::Failure)
                && message
                    .correlation_id()
                    .is_some_and(|id| registry.get(id).is_none())
        });

        let Some(message) = stale else {
            return BehaviorStatus::Idle;
        };
        let Some(correlation_id) = message.correlation_id().cloned() else {
            return BehaviorStatus::Progressed;
        };

        info!(
            worker = %ctx.worker_id(),
            sender = %message.sender(),
            performative = %message.performative(),
            correlation_id = %correlation_id,
            "Discarding reply for a correlation that is no longer pending"
        );
        metrics::counter!("triage_late_replies_discarded_total").increment(1);
        self.events.publish(PipelineEvent::LateReplyDiscarded {
            correlation_id,
            sender: message.sender().clone(),
            discarded_at: Utc::now(),
        });
        BehaviorStatus::Progressed
    }
}
