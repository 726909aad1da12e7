// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure value types for inter-worker messaging. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`message`] | `Message`, `WorkerId`, `Performative`, `CorrelationId`, `MailboxEntry` |
//! | [`template`] | `PatternTemplate` |
//! | [`correlation`] | `CorrelationEntry`, `CorrelationState`, `SwarmError` |

pub mod message;
pub mod template;
pub mod correlation;

pub use message::*;
pub use template::*;
pub use correlation::*;
