// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Triage Domain Layer
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`severity`] | `SeverityTier`, `FollowUpAction`, `RoutingDecision`, `route_for` |
//! | [`patient`] | `PatientIntake`, `RiskAssessment`, `PatientFeatures` |
//! | [`scoring`] | `RiskScoringService` port, `ScoringError` |
//! | [`llm`] | `LLMProvider` port, `GenerationOptions`, `LLMError` |
//! | [`storage`] | `ExplanationStore` port, `StorageError` |
//! | [`error`] | `PipelineError` |
//! | [`events`] | `PipelineEvent` |
//! | [`node_config`] | `TriageConfigManifest` |

pub mod error;
pub mod events;
pub mod llm;
pub mod node_config;
pub mod patient;
pub mod scoring;
pub mod severity;
pub mod storage;
