// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # triage-core
//!
//! Patient-risk triage pipeline built on the `triage-swarm` runtime.
//!
//! ```text
//! HTTP intake -> Gateway -> Classifier -> Judge -> Explainer
//!                              |            |  \
//!                       scoring service     |   Notifier
//!                                           |
//!                               reply waiter (correlated)
//! ```
//!
//! | Layer | Contents |
//! |-------|----------|
//! | [`domain`] | severity tiers, payloads, collaborator ports, config manifest |
//! | [`infrastructure`] | HTTP clients, LLM adapters, prompt builder, event bus |
//! | [`application`] | the five workers and [`application::TriagePipeline`] |
//! | [`presentation`] | axum router |

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
