// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod llm;
pub mod prompt_template_engine;
pub mod scoring_client;
pub mod storage_client;

pub use event_bus::{EventBus, EventBusError, EventReceiver, UserEventReceiver};
pub use prompt_template_engine::ExplanationPromptBuilder;
pub use scoring_client::HttpRiskScoringClient;
pub use storage_client::{build_store, HttpExplanationStore, NoopExplanationStore};
