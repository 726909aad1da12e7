// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Pipeline error taxonomy.
//!
//! | Variant | Raised by | Outcome |
//! |---------|-----------|---------|
//! | `MalformedPayload` | Gateway, Judge, Explainer | dropped and logged, or a FAILURE reply |
//! | `ScoringUnavailable` | Classifier | request dropped, nothing sent to the Judge |
//! | `GenerationFailed` | Explainer | FAILURE reply to the requester |
//! | `Storage` | Explainer | logged only |
//! | `Swarm` | any worker | logged; never crashes the worker |
//!
//! "No match" is not an error: `Mailbox::try_match` simply returns `None`.

use crate::domain::llm::LLMError;
use crate::domain::scoring::ScoringError;
use crate::domain::storage::StorageError;
use thiserror::Error;
use triage_swarm::SwarmError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Risk scoring unavailable: {0}")]
    ScoringUnavailable(#[from] ScoringError),

    #[error("Explanation generation failed: {0}")]
    GenerationFailed(#[from] LLMError),

    #[error("Explanation storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Swarm(#[from] SwarmError),
}
