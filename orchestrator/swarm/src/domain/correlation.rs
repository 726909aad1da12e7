// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Correlation Records
//!
//! A [`CorrelationEntry`] tracks one outstanding request → reply expectation.
//! Entries are created `Pending` by the requester, and end either
//! `Fulfilled` (the expected replier answered) or `Expired` (abandoned by a
//! timeout policy or a supervisor). Resolved entries are discarded by the
//! registry; the terminal state is only visible in the value returned to the
//! caller.

use super::message::{CorrelationId, WorkerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CorrelationState {
    Pending,
    Fulfilled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub correlation_id: CorrelationId,
    pub expected_replier: WorkerId,
    pub created_at: DateTime<Utc>,
    pub state: CorrelationState,
}

impl CorrelationEntry {
    pub fn pending(correlation_id: CorrelationId, expected_replier: WorkerId) -> Self {
        Self {
            correlation_id,
            expected_replier,
            created_at: Utc::now(),
            state: CorrelationState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == CorrelationState::Pending
    }
}

/// Errors raised by the swarm runtime. None of these crash a worker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwarmError {
    #[error("Correlation id {0} is already registered and unresolved")]
    DuplicateCorrelationId(CorrelationId),

    #[error("Reply for {correlation_id} came from {actual}, expected {expected}")]
    UnexpectedReplier {
        correlation_id: CorrelationId,
        expected: WorkerId,
        actual: WorkerId,
    },

    #[error("Correlation id {0} is unknown or already resolved")]
    UnknownCorrelationId(CorrelationId),

    #[error("No worker registered as {0}")]
    UnknownReceiver(WorkerId),

    #[error("Worker {0} is already registered")]
    WorkerAlreadyRegistered(WorkerId),
}
