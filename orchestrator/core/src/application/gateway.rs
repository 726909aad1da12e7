// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Gateway: external-facing intake adapter.
//!
//! Not a mailbox consumer. It validates raw input and injects one REQUEST
//! into the swarm per accepted payload. Callers always get an
//! acknowledgement; pipeline outcomes are only observable as events.

use crate::domain::error::PipelineError;
use crate::domain::events::PipelineEvent;
use crate::domain::patient::PatientIntake;
use crate::infrastructure::event_bus::EventBus;
use chrono::Utc;
use tracing::{info, warn};
use triage_swarm::{Message, MessageId, SwarmCoordinator, WorkerId};

/// Body returned to every intake caller.
pub const ACKNOWLEDGEMENT: &str =
    "Requisição recebida com sucesso pelo AgenteGerenciadorPacientes!";

#[derive(Clone)]
pub struct Gateway {
    id: WorkerId,
    classifier: WorkerId,
    notifier: WorkerId,
    coordinator: SwarmCoordinator,
    events: EventBus,
}

impl Gateway {
    pub fn new(
        id: WorkerId,
        classifier: WorkerId,
        notifier: WorkerId,
        coordinator: SwarmCoordinator,
        events: EventBus,
    ) -> Self {
        Self {
            id,
            classifier,
            notifier,
            coordinator,
            events,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Validate `raw` and forward it to the Classifier.
    ///
    /// Malformed input is logged and dropped: nothing is sent and the error
    /// is returned for the caller to ignore.
    pub fn submit(&self, raw: &[u8]) -> Result<MessageId, PipelineError> {
        let intake = match PatientIntake::parse(raw) {
            Ok(intake) => intake,
            Err(e) => {
                warn!(gateway = %self.id, bytes = raw.len(), error = %e, "Dropping malformed intake");
                metrics::counter!("triage_intake_total", "outcome" => "rejected").increment(1);
                self.events.publish(PipelineEvent::IntakeRejected {
                    reason: e.to_string(),
                    rejected_at: Utc::now(),
                });
                return Err(e);
            }
        };

        let user_id = intake.user_id();
        let message = Message::request(self.id.clone(), self.classifier.clone(), intake.to_bytes());
        let message_id = message.id();
        self.coordinator.send(message)?;

        info!(
            gateway = %self.id,
            user_id = user_id.as_deref().unwrap_or("unknown"),
            message_id = %message_id,
            "Patient data forwarded to classifier"
        );
        metrics::counter!("triage_intake_total", "outcome" => "accepted").increment(1);
        self.events.publish(PipelineEvent::IntakeAccepted {
            user_id,
            received_at: Utc::now(),
        });
        Ok(message_id)
    }

    /// Send a free-text notification straight to the Notifier.
    pub fn alert(&self, text: &str) -> Result<MessageId, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::MalformedPayload("alert text is empty".into()));
        }

        let message = Message::request(self.id.clone(), self.notifier.clone(), text.to_string());
        let message_id = message.id();
        self.coordinator.send(message)?;
        info!(gateway = %self.id, message_id = %message_id, "Manual alert sent to notifier");
        Ok(message_id)
    }
}
