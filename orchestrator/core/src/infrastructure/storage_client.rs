// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Explanation Storage Adapters
//
// HttpExplanationStore relays explanations to the patient backend:
//   POST {endpoint}/explanation/{user_id}   {"explanation": "..."}
// The user id is appended as a single percent-encoded path segment.
// NoopExplanationStore is used when storage is disabled in the manifest.

use crate::domain::node_config::StorageConfig;
use crate::domain::storage::{ExplanationStore, StorageError};
use async_trait::async_trait;
use serde::Serialize;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct StoreRequest<'a> {
    explanation: &'a str,
}

pub struct HttpExplanationStore {
    client: reqwest::Client,
    endpoint: Url,
    timeout_secs: u64,
}

impl HttpExplanationStore {
    pub fn new(endpoint: impl AsRef<str>, timeout: Duration) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint.as_ref())
            .map_err(|e| StorageError::InvalidEndpoint(format!("{}: {}", endpoint.as_ref(), e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn url_for(&self, user_id: &str) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push("explanation")
            .push(user_id);
        Ok(url)
    }
}

#[async_trait]
impl ExplanationStore for HttpExplanationStore {
    async fn store(&self, user_id: &str, explanation: &str) -> Result<(), StorageError> {
        let url = self.url_for(user_id)?;

        let response = self
            .client
            .post(url.clone())
            .json(&StoreRequest { explanation })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout(self.timeout_secs)
                } else {
                    StorageError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %url, "Explanation stored");
        Ok(())
    }
}

/// Discards explanations (storage disabled).
#[derive(Debug, Default)]
pub struct NoopExplanationStore;

#[async_trait]
impl ExplanationStore for NoopExplanationStore {
    async fn store(&self, user_id: &str, explanation: &str) -> Result<(), StorageError> {
        info!(
            user_id,
            chars = explanation.chars().count(),
            "Explanation storage disabled, not relaying"
        );
        Ok(())
    }
}

/// Build the store the manifest asks for.
pub fn build_store(config: &StorageConfig) -> Result<std::sync::Arc<dyn ExplanationStore>, StorageError> {
    if config.enabled {
        Ok(std::sync::Arc::new(HttpExplanationStore::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?))
    } else {
        Ok(std::sync::Arc::new(NoopExplanationStore))
    }
}
