// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running triage node

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeHealth {
    pub status: String,
    pub uptime_seconds: u64,
    pub pending_correlations: usize,
    #[serde(default)]
    pub generation: Option<GenerationHealth>,
}

/// Reachability of the node's text-generation provider.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationHealth {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST a raw patient record to `/registrar`; returns the acknowledgement text.
    pub async fn submit(&self, payload: Vec<u8>) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/registrar", self.base_url))
            .header("content-type", "application/json")
            .body(payload)
            .send()
            .await
            .context("Failed to submit patient record")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to submit patient record: {}", error_text);
        }

        response
            .text()
            .await
            .context("Failed to read intake acknowledgement")
    }

    pub async fn alert(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/alerts", self.base_url))
            .header("content-type", "text/plain; charset=utf-8")
            .body(text.to_string())
            .send()
            .await
            .context("Failed to send alert")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to send alert: {}", error_text);
        }

        response.text().await.context("Failed to read alert response")
    }

    pub async fn health(&self) -> Result<NodeHealth> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Node is not reachable")?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed: HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse health response")
    }
}
