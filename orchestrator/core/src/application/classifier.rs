// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Classifier worker.
//!
//! Matches REQUEST messages from the Gateway, calls the risk scoring service
//! and forwards the result to the Judge as INFORM. When scoring fails the
//! request is dropped: there is no reply path back to the Gateway.

use crate::domain::events::PipelineEvent;
use crate::domain::patient::RiskAssessment;
use crate::domain::scoring::RiskScoringService;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use triage_swarm::{
    CyclicBehavior, Message, MessageHandler, PatternTemplate, Performative, WorkerContext, WorkerId,
};

pub struct Classifier {
    scoring: Arc<dyn RiskScoringService>,
    judge: WorkerId,
    events: EventBus,
}

impl Classifier {
    pub fn new(scoring: Arc<dyn RiskScoringService>, judge: WorkerId, events: EventBus) -> Self {
        Self {
            scoring,
            judge,
            events,
        }
    }

    /// Cyclic behavior accepting requests from `gateway` only.
    pub fn into_behavior(self, gateway: WorkerId) -> CyclicBehavior<Self> {
        CyclicBehavior::new(
            "classify-intake",
            PatternTemplate::any()
                .performative(Performative::Request)
                .sender(gateway),
            self,
        )
    }

    fn scoring_failed(&self, user_id: Option<String>, error: String) {
        metrics::counter!("triage_scoring_total", "outcome" => "failed").increment(1);
        self.events.publish(PipelineEvent::ScoringFailed {
            user_id,
            error,
            failed_at: Utc::now(),
        });
    }
}

/// The scoring service may omit `user_id`; carry the request's over.
fn enrich_with_user_id(result: &mut Value, user_id: Option<&str>) {
    let (Some(user_id), Some(object)) = (user_id, result.as_object_mut()) else {
        return;
    };
    let missing = object.get("user_id").map_or(true, Value::is_null);
    if missing {
        object.insert("user_id".to_string(), Value::String(user_id.to_string()));
    }
}

#[async_trait]
impl MessageHandler for Classifier {
    async fn handle(&mut self, message: Message, ctx: &WorkerContext) {
        let patient: Value = match message.payload_json() {
            Ok(patient) => patient,
            Err(e) => {
                warn!(worker = %ctx.worker_id(), error = %e, "Intake payload is not JSON, dropping");
                self.scoring_failed(None, format!("malformed payload: {}", e));
                return;
            }
        };
        let user_id = patient
            .get("user_id")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        info!(
            worker = %ctx.worker_id(),
            user_id = user_id.as_deref().unwrap_or("unknown"),
            "Requesting risk score"
        );

        let started = Instant::now();
        let mut result = match self.scoring.score(&patient).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    worker = %ctx.worker_id(),
                    user_id = user_id.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "Risk scoring failed, dropping request"
                );
                self.scoring_failed(user_id, e.to_string());
                return;
            }
        };
        enrich_with_user_id(&mut result, user_id.as_deref());

        let assessment = match RiskAssessment::from_value(result.clone()) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(worker = %ctx.worker_id(), error = %e, "Scoring result unusable, dropping request");
                self.scoring_failed(user_id, e.to_string());
                return;
            }
        };

        let payload = match serde_json::to_vec(&result) {
            Ok(payload) => payload,
            Err(e) => {
                error!(worker = %ctx.worker_id(), error = %e, "Failed to encode scoring result");
                return;
            }
        };

        if let Err(e) = ctx.send(Message::inform(ctx.worker_id().clone(), self.judge.clone(), payload)) {
            error!(worker = %ctx.worker_id(), error = %e, "Failed to forward score to judge");
            return;
        }

        info!(
            worker = %ctx.worker_id(),
            user_id = assessment.user_id_or_unknown(),
            chronic_risk_score = assessment.chronic_risk_score,
            risk_level = assessment.risk_level.as_deref().unwrap_or("-"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Risk score forwarded to judge"
        );
        metrics::counter!("triage_scoring_total", "outcome" => "completed").increment(1);
        self.events.publish(PipelineEvent::ScoringCompleted {
            user_id: assessment.user_id.clone(),
            chronic_risk_score: assessment.chronic_risk_score,
            risk_level: assessment.risk_level.clone(),
            completed_at: Utc::now(),
        });
    }
}
