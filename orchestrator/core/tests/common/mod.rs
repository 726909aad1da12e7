// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use triage_core::application::{PipelineCollaborators, TriagePipeline};
use triage_core::domain::events::PipelineEvent;
use triage_core::domain::llm::{
    FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, TokenUsage,
};
use triage_core::domain::node_config::TriageConfigSpec;
use triage_core::domain::scoring::{RiskScoringService, ScoringError};
use triage_core::domain::storage::{ExplanationStore, StorageError};
use triage_core::infrastructure::event_bus::EventReceiver;

pub struct StubScoring {
    pub result: Result<Value, ScoringError>,
    pub calls: Mutex<Vec<Value>>,
}

impl StubScoring {
    pub fn returning(result: Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(result),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ScoringError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn critical() -> Arc<Self> {
        Self::returning(json!({"chronic_risk_score": 0.85, "risk_level": "Muito Alto"}))
    }
}

#[async_trait]
impl RiskScoringService for StubScoring {
    async fn score(&self, patient: &Value) -> Result<Value, ScoringError> {
        self.calls.lock().push(patient.clone());
        self.result.clone()
    }
}

pub struct StubGenerator {
    pub result: Result<String, LLMError>,
    pub health: Result<(), LLMError>,
    pub delay: Duration,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            health: Ok(()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: LLMError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            health: Ok(()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            health: Ok(()),
            delay,
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Provider that fails both generation and its health check.
    pub fn unreachable(error: LLMError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error.clone()),
            health: Err(error),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LLMProvider for StubGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        self.prompts.lock().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let text = self.result.clone()?;
        Ok(GenerationResponse {
            text,
            usage: TokenUsage::default(),
            provider: "stub".to_string(),
            model: "stub".to_string(),
            finish_reason: FinishReason::Stop,
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        self.health.clone()
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    pub stored: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            stored: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ExplanationStore for RecordingStore {
    async fn store(&self, user_id: &str, explanation: &str) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Rejected {
                status: 500,
                body: "backend down".into(),
            });
        }
        self.stored
            .lock()
            .push((user_id.to_string(), explanation.to_string()));
        Ok(())
    }
}

pub fn start(
    spec: &TriageConfigSpec,
    scoring: Arc<StubScoring>,
    generator: Arc<StubGenerator>,
    store: Arc<RecordingStore>,
) -> TriagePipeline {
    TriagePipeline::start(
        spec,
        PipelineCollaborators {
            scoring,
            generator,
            store,
        },
    )
    .unwrap()
}

/// Receive events until one satisfies `predicate`; returns everything seen.
pub async fn collect_until(
    receiver: &mut EventReceiver,
    wait: Duration,
    predicate: impl Fn(&PipelineEvent) -> bool,
) -> Vec<PipelineEvent> {
    let mut seen = Vec::new();
    let finished = timeout(wait, async {
        loop {
            let event = receiver.recv().await.unwrap();
            let done = predicate(&event);
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .is_ok();
    assert!(finished, "timed out; events so far: {:#?}", seen);
    seen
}
