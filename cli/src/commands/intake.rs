// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! Operator commands against a running node: submit, alert, status

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Read;
use std::path::Path;

use super::NodeTarget;
use crate::client::NodeClient;

/// Read the record from `file` (`-` for stdin) and post it to the node.
pub async fn submit(target: &NodeTarget, file: &Path) -> Result<()> {
    let payload = read_payload(file)?;

    // the node acknowledges anything; catch obvious mistakes locally
    if serde_json::from_slice::<serde_json::Value>(&payload).is_err() {
        println!(
            "{}",
            "⚠ Payload is not valid JSON; the node will acknowledge but drop it".yellow()
        );
    }

    let client = NodeClient::new(target.base_url())?;
    let ack = client.submit(payload).await?;
    println!("{} {}", "✓".green(), ack);
    Ok(())
}

pub async fn alert(target: &NodeTarget, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Alert text cannot be empty");
    }
    let client = NodeClient::new(target.base_url())?;
    let response = client.alert(text).await?;
    println!("{} {}", "✓".green(), response);
    Ok(())
}

pub async fn status(target: &NodeTarget) -> Result<()> {
    let client = NodeClient::new(target.base_url())?;
    match client.health().await {
        Ok(health) => {
            println!("{}", "✓ Node is running".green());
            println!("  Address: {}", target.base_url());
            println!("  Status: {}", health.status);
            println!("  Uptime: {}s", health.uptime_seconds);
            println!("  Pending explanations: {}", health.pending_correlations);
            if let Some(generation) = &health.generation {
                match &generation.error {
                    Some(error) => println!(
                        "  Text generation: {} ({})",
                        generation.status.yellow(),
                        error.dimmed()
                    ),
                    None => println!("  Text generation: {}", generation.status),
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", "✗ Node is not running".red());
            println!("  Address: {}", target.base_url());
            println!("  Error: {}", format!("{:#}", e).dimmed());
            std::process::exit(1);
        }
    }
}

fn read_payload(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read patient record from stdin")?;
        return Ok(buf);
    }
    std::fs::read(file).with_context(|| format!("Failed to read patient record {:?}", file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"user_id":"p1"}"#).unwrap();

        let payload = read_payload(file.path()).unwrap();
        assert_eq!(payload, br#"{"user_id":"p1"}"#);
    }

    #[test]
    fn test_read_payload_missing_file() {
        let err = read_payload(Path::new("/nonexistent/patient.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read patient record"));
    }

    #[tokio::test]
    async fn test_alert_rejects_blank_text() {
        let target = NodeTarget::new(None, Some(1));
        assert!(alert(&target, "   ").await.is_err());
    }
}
