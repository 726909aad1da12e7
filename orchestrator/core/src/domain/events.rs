// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Pipeline Events
//
// Published on the EventBus as patients move through the pipeline. Events are
// observational: nothing in the pipeline depends on anybody listening.

use crate::domain::severity::{FollowUpAction, SeverityTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_swarm::{CorrelationId, WorkerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    IntakeAccepted {
        user_id: Option<String>,
        received_at: DateTime<Utc>,
    },
    IntakeRejected {
        reason: String,
        rejected_at: DateTime<Utc>,
    },
    ScoringCompleted {
        user_id: Option<String>,
        chronic_risk_score: f64,
        risk_level: Option<String>,
        completed_at: DateTime<Utc>,
    },
    ScoringFailed {
        user_id: Option<String>,
        error: String,
        failed_at: DateTime<Utc>,
    },
    TierAssigned {
        user_id: Option<String>,
        tier: SeverityTier,
        chronic_risk_score: f64,
        actions: Vec<FollowUpAction>,
        assigned_at: DateTime<Utc>,
    },
    ExplanationRequested {
        user_id: Option<String>,
        correlation_id: CorrelationId,
        requested_at: DateTime<Utc>,
    },
    ExplanationReceived {
        user_id: Option<String>,
        correlation_id: CorrelationId,
        explanation: String,
        received_at: DateTime<Utc>,
    },
    ExplanationFailed {
        user_id: Option<String>,
        correlation_id: CorrelationId,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    CorrelationFulfilled {
        correlation_id: CorrelationId,
        replier: WorkerId,
        fulfilled_at: DateTime<Utc>,
    },
    CorrelationExpired {
        correlation_id: CorrelationId,
        expected_replier: WorkerId,
        expired_at: DateTime<Utc>,
    },
    /// A reply arrived after its correlation was expired or fulfilled.
    LateReplyDiscarded {
        correlation_id: CorrelationId,
        sender: WorkerId,
        discarded_at: DateTime<Utc>,
    },
    NotificationDelivered {
        sender: WorkerId,
        content: String,
        delivered_at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Patient the event is about, when known.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::IntakeAccepted { user_id, .. }
            | PipelineEvent::ScoringCompleted { user_id, .. }
            | PipelineEvent::ScoringFailed { user_id, .. }
            | PipelineEvent::TierAssigned { user_id, .. }
            | PipelineEvent::ExplanationRequested { user_id, .. }
            | PipelineEvent::ExplanationReceived { user_id, .. }
            | PipelineEvent::ExplanationFailed { user_id, .. } => user_id.as_deref(),
            PipelineEvent::IntakeRejected { .. }
            | PipelineEvent::CorrelationFulfilled { .. }
            | PipelineEvent::CorrelationExpired { .. }
            | PipelineEvent::LateReplyDiscarded { .. }
            | PipelineEvent::NotificationDelivered { .. } => None,
        }
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        match self {
            PipelineEvent::ExplanationRequested { correlation_id, .. }
            | PipelineEvent::ExplanationReceived { correlation_id, .. }
            | PipelineEvent::ExplanationFailed { correlation_id, .. }
            | PipelineEvent::CorrelationFulfilled { correlation_id, .. }
            | PipelineEvent::CorrelationExpired { correlation_id, .. }
            | PipelineEvent::LateReplyDiscarded { correlation_id, .. } => Some(correlation_id),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::IntakeAccepted { .. } => "intake_accepted",
            PipelineEvent::IntakeRejected { .. } => "intake_rejected",
            PipelineEvent::ScoringCompleted { .. } => "scoring_completed",
            PipelineEvent::ScoringFailed { .. } => "scoring_failed",
            PipelineEvent::TierAssigned { .. } => "tier_assigned",
            PipelineEvent::ExplanationRequested { .. } => "explanation_requested",
            PipelineEvent::ExplanationReceived { .. } => "explanation_received",
            PipelineEvent::ExplanationFailed { .. } => "explanation_failed",
            PipelineEvent::CorrelationFulfilled { .. } => "correlation_fulfilled",
            PipelineEvent::CorrelationExpired { .. } => "correlation_expired",
            PipelineEvent::LateReplyDiscarded { .. } => "late_reply_discarded",
            PipelineEvent::NotificationDelivered { .. } => "notification_delivered",
        }
    }
}
