// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the triage CLI

pub mod config;
pub mod intake;
pub mod serve;

pub use self::config::ConfigCommand;

use clap::ValueEnum;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8888;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Address of a running node, as given by `--host` / `--port`.
#[derive(Debug, Clone)]
pub struct NodeTarget {
    pub host: String,
    pub port: u16,
}

impl NodeTarget {
    pub fn new(host: Option<String>, port: Option<u16>) -> Self {
        Self {
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: port.unwrap_or(DEFAULT_PORT),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
