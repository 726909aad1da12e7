// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Risk Scoring HTTP Adapter
//
// POSTs the patient JSON to the prediction endpoint and returns the JSON
// body untouched. Status and transport failures are mapped to ScoringError so
// the Classifier can tell a timeout from an outage.

use crate::domain::node_config::ScoringConfig;
use crate::domain::scoring::{RiskScoringService, ScoringError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct HttpRiskScoringClient {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpRiskScoringClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self, ScoringError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RiskScoringService for HttpRiskScoringClient {
    async fn score(&self, patient: &Value) -> Result<Value, ScoringError> {
        let started = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(patient)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScoringError::Timeout(self.timeout_secs)
                } else {
                    ScoringError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Unavailable(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout(self.timeout_secs)
            } else {
                ScoringError::Unavailable(e.to_string())
            }
        })?;

        let result: Value = serde_json::from_str(&body)
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;
        if !result.is_object() {
            return Err(ScoringError::InvalidResponse(
                "expected a JSON object".to_string(),
            ));
        }

        let elapsed_ms = started.elapsed().as_millis() as f64;
        metrics::histogram!("triage_scoring_latency_ms").record(elapsed_ms);
        debug!(endpoint = %self.endpoint, elapsed_ms, "Risk scoring call succeeded");
        Ok(result)
    }
}
