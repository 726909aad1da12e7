// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// HTTP intake surface.
//
//   POST /registrar      patient JSON -> Gateway (always 200 + acknowledgement)
//   POST /api/intake     same as /registrar
//   POST /api/alerts     free text -> Notifier (always 200)
//   GET  /api/events     Server-Sent Events stream of pipeline events (?user_id= to filter)
//   GET  /health         liveness, pending correlation count and text-generation
//                        provider reachability ("degraded" when unreachable)

use crate::application::gateway::{Gateway, ACKNOWLEDGEMENT};
use crate::application::pipeline::TriagePipeline;
use crate::domain::events::PipelineEvent;
use crate::domain::llm::{LLMError, LLMProvider};
use crate::infrastructure::event_bus::{EventBus, EventBusError, EventReceiver, UserEventReceiver};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use triage_swarm::CorrelationRegistry;

/// Upper bound on the provider health check so `/health` stays responsive.
const GENERATION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AppState {
    pub gateway: Gateway,
    pub generator: Arc<dyn LLMProvider>,
    pub correlations: Arc<CorrelationRegistry>,
    pub events: EventBus,
    pub started_at: Instant,
}

pub fn app(pipeline: &TriagePipeline) -> Router {
    let state = Arc::new(AppState {
        gateway: pipeline.gateway().clone(),
        generator: pipeline.generator().clone(),
        correlations: pipeline.correlations().clone(),
        events: pipeline.events().clone(),
        started_at: Instant::now(),
    });

    Router::new()
        .route("/registrar", post(intake))
        .route("/api/intake", post(intake))
        .route("/api/alerts", post(alert))
        .route("/api/events", get(stream_events))
        .route("/health", get(health))
        .with_state(state)
}

async fn intake(State(state): State<Arc<AppState>>, body: Bytes) -> &'static str {
    // outcome is only visible through events
    if let Err(e) = state.gateway.submit(&body) {
        debug!(error = %e, "Intake not forwarded");
    }
    ACKNOWLEDGEMENT
}

async fn alert(State(state): State<Arc<AppState>>, body: Bytes) -> &'static str {
    let text = String::from_utf8_lossy(&body);
    if let Err(e) = state.gateway.alert(&text) {
        debug!(error = %e, "Alert not forwarded");
    }
    "Alerta recebido"
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let check = tokio::time::timeout(GENERATION_CHECK_TIMEOUT, state.generator.health_check())
        .await
        .unwrap_or_else(|_| Err(LLMError::Timeout(GENERATION_CHECK_TIMEOUT.as_secs())));

    let (status, generation) = match check {
        Ok(()) => ("healthy", json!({ "status": "reachable" })),
        Err(e) => {
            warn!(error = %e, "Text-generation provider health check failed");
            ("degraded", json!({ "status": "unreachable", "error": e.to_string() }))
        }
    };

    Json(json!({
        "status": status,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "pending_correlations": state.correlations.pending_count(),
        "generation": generation,
    }))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    user_id: Option<String>,
}

enum Subscription {
    All(EventReceiver),
    Patient(UserEventReceiver),
}

impl Subscription {
    async fn recv(&mut self) -> Result<PipelineEvent, EventBusError> {
        match self {
            Subscription::All(receiver) => receiver.recv().await,
            Subscription::Patient(receiver) => receiver.recv().await,
        }
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = match query.user_id {
        Some(user_id) => Subscription::Patient(state.events.subscribe_user(user_id)),
        None => Subscription::All(state.events.subscribe()),
    };

    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        loop {
            match subscription.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    let sse = Event::default().event(event.kind()).data(data);
                    return Some((Ok(sse), subscription));
                }
                Err(EventBusError::Lagged(_)) | Err(EventBusError::Empty) => continue,
                Err(EventBusError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
