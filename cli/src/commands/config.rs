// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use triage_core::domain::node_config::TriageConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./triage-config.yaml)
        #[arg(short, long, default_value = "./triage-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        for (i, path) in TriageConfigManifest::search_paths().iter().enumerate() {
            let marker = if path.exists() { "✓".green() } else { "-".dimmed() };
            println!("  {}. {} {}", i + 1, marker, path.display());
        }
        println!();
    }

    let config = TriageConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let spec = &config.spec;

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Node:".bold());
    println!("  Name: {}", config.metadata.name);
    println!(
        "  Intake: {}:{}",
        spec.gateway.bind_address, spec.gateway.port
    );
    println!();

    println!("{}", "Workers:".bold());
    for id in spec.workers.all() {
        println!("  - {}", id);
    }
    println!();

    println!("{}", "Collaborators:".bold());
    println!(
        "  Scoring: {} (timeout {}s)",
        spec.scoring.endpoint, spec.scoring.timeout_seconds
    );
    println!(
        "  Generation: {} {} at {}",
        spec.generation.provider_type.as_str(),
        spec.generation.model,
        spec.generation.endpoint
    );
    if spec.storage.enabled {
        println!("  Storage: {}", spec.storage.endpoint);
    } else {
        println!("  Storage: {}", "(disabled)".dimmed());
    }
    println!();

    println!("{}", "Correlation:".bold());
    match spec.correlation.reply_timeout() {
        Some(timeout) => println!(
            "  Reply timeout: {}s (swept every {}s)",
            timeout.as_secs(),
            spec.correlation.sweep_interval().as_secs()
        ),
        None => println!("  Reply timeout: {}", "(none)".dimmed()),
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = TriageConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    let sample = include_str!("../../templates/triage-config.yaml");

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_is_valid() {
        let sample = include_str!("../../templates/triage-config.yaml");
        let manifest = TriageConfigManifest::from_yaml_str(sample).unwrap();
        manifest.validate().unwrap();
    }

    #[tokio::test]
    async fn test_generate_writes_sample() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("triage-config.yaml");

        generate(output.clone()).await.unwrap();

        let manifest = TriageConfigManifest::from_yaml_file(&output).unwrap();
        assert_eq!(manifest.spec.gateway.port, 8888);
    }
}
