// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Explanation Storage Port
//
// Generated explanations are relayed to the patient backend. Failures are
// logged by the Explainer and never retried.

use async_trait::async_trait;
use thiserror::Error;

#[async_trait]
pub trait ExplanationStore: Send + Sync {
    async fn store(&self, user_id: &str, explanation: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage backend unreachable: {0}")]
    Network(String),

    #[error("storage backend rejected the explanation: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("storage backend timed out after {0}s")]
    Timeout(u64),

    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
}
