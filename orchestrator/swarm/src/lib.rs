// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # `triage-swarm`: Worker Messaging Runtime
//!
//! Asynchronous message passing between named workers, with selective
//! receive, cooperative behaviors and request/reply correlation.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Message`, `WorkerId`, `PatternTemplate`, `CorrelationEntry`, `SwarmError` |
//! | [`application`] | Application | `Mailbox`, behaviors, `Worker` scheduler, `CorrelationRegistry`, `SwarmCoordinator` |
//!
//! ## Key Concepts
//!
//! - **Worker**: an addressable participant owning one mailbox and a set of
//!   behaviors. Each worker runs on its own tokio task.
//! - **Selective receive**: a behavior takes the first queued message matching
//!   its template; everything else stays queued in order.
//! - **Correlation**: a requester registers the id it expects a reply under
//!   *before* sending, so a fast reply can never arrive unregistered.
//!
//! ## Delivery
//!
//! Per sender→receiver pair, messages arrive in send order. Nothing is
//! persisted and nothing is retried: a crash loses queued messages.

pub mod application;
pub mod domain;

pub use application::*;
pub use domain::*;
