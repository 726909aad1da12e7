// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`triage-core`)
//!
//! HTTP surface that translates external requests into Gateway calls.
//! **No business logic lives here.**
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP/SSE (Axum) | Patient intake, manual alerts, health, event stream |

pub mod api;
