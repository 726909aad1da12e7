// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Runtime
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`mailbox`] | `Mailbox` |
//! | [`behavior`] | `Behavior`, `MessageHandler`, `CyclicBehavior`, `ReplyWaiter` |
//! | [`scheduler`] | `Worker`, `WorkerHandle`, `WorkerContext`, `BehaviorHandle` |
//! | [`correlation_registry`] | `CorrelationRegistry` |
//! | [`coordinator`] | `SwarmCoordinator` |

pub mod behavior;
pub mod coordinator;
pub mod correlation_registry;
pub mod mailbox;
pub mod scheduler;

pub use behavior::{Behavior, BehaviorStatus, CyclicBehavior, MessageHandler, ReplyWaiter};
pub use coordinator::SwarmCoordinator;
pub use correlation_registry::CorrelationRegistry;
pub use mailbox::Mailbox;
pub use scheduler::{
    BehaviorHandle, BehaviorId, TickOutcome, Worker, WorkerContext, WorkerHandle,
    DEFAULT_IDLE_BACKOFF,
};
