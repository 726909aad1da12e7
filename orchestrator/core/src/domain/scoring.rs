// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Risk Scoring Port
//
// The scoring model is an external collaborator. The Classifier only needs
// "JSON in, JSON out"; the HTTP adapter lives in infrastructure/scoring_client.rs.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[async_trait]
pub trait RiskScoringService: Send + Sync {
    /// Score a patient payload. The result carries at least
    /// `chronic_risk_score` and usually `risk_level`.
    async fn score(&self, patient: &Value) -> Result<Value, ScoringError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoringError {
    /// Transport failure or non-2xx status.
    #[error("scoring service unavailable: {0}")]
    Unavailable(String),

    #[error("scoring service timed out after {0}s")]
    Timeout(u64),

    #[error("scoring service returned an invalid response: {0}")]
    InvalidResponse(String),
}
