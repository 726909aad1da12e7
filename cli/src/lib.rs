// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Triage CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Node entry point (`serve`) and an HTTP client for operators

pub mod client;
pub mod commands;
