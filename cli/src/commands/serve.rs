// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

//! `triage serve`: run a node in the foreground until Ctrl+C / SIGTERM

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use triage_core::application::{PipelineCollaborators, TriagePipeline};
use triage_core::domain::node_config::TriageConfigManifest;
use triage_core::presentation::api;

pub async fn run(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config =
        TriageConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    if let Some(host) = host {
        config.spec.gateway.bind_address = host;
    }
    if let Some(port) = port {
        config.spec.gateway.port = port;
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        node = %config.metadata.name,
        scoring = %config.spec.scoring.endpoint,
        provider = config.spec.generation.provider_type.as_str(),
        model = %config.spec.generation.model,
        storage_enabled = config.spec.storage.enabled,
        "Configuration loaded"
    );

    install_metrics_exporter(&config)?;

    let collaborators = PipelineCollaborators::from_config(&config.spec)?;
    let pipeline = TriagePipeline::start(&config.spec, collaborators)?;
    let app = api::app(&pipeline);

    let addr = format!(
        "{}:{}",
        config.spec.gateway.bind_address, config.spec.gateway.port
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Triage node listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    info!("Triage node shutting down");
    pipeline.shutdown().await;

    served
}

fn install_metrics_exporter(config: &TriageConfigManifest) -> Result<()> {
    let Some(metrics) = config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref())
    else {
        return Ok(());
    };
    if !metrics.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
