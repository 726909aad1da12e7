// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! # HeartPredict Triage Node CLI
//!
//! The `triage` binary runs a triage node and talks to a running one.
//!
//! ## Commands
//!
//! - `triage serve` - Start the HTTP intake server and the five workers
//! - `triage submit <FILE|->` - Send a patient record to a running node
//! - `triage alert <TEXT>` - Send a manual alert to the notifier
//! - `triage status` - Query node health
//! - `triage config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use triage_orchestrator::commands::{self, ConfigCommand, LogFormat};

/// HeartPredict triage node
#[derive(Parser)]
#[command(name = "triage")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TRIAGE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Node port (default: from configuration, else 8888)
    #[arg(long, global = true, env = "TRIAGE_PORT")]
    port: Option<u16>,

    /// Node host (serve: bind address; other commands: node to contact)
    #[arg(long, global = true, env = "TRIAGE_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TRIAGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "TRIAGE_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the triage node in the foreground
    #[command(name = "serve")]
    Serve,

    /// Submit a patient record (JSON file, or - for stdin)
    #[command(name = "submit")]
    Submit {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Send a manual alert to the notifier
    #[command(name = "alert")]
    Alert {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Show node health
    #[command(name = "status")]
    Status,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format)?;

    let target = commands::NodeTarget::new(cli.host.clone(), cli.port);

    match cli.command {
        Some(Commands::Serve) => commands::serve::run(cli.config, cli.host, cli.port).await,
        Some(Commands::Submit { file }) => commands::intake::submit(&target, &file).await,
        Some(Commands::Alert { text }) => commands::intake::alert(&target, &text).await,
        Some(Commands::Status) => commands::intake::status(&target).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.compact().init(),
    }

    Ok(())
}
