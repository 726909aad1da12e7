// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! Notifier worker.
//!
//! Consumes every message addressed to it and reports it. Never replies.

use crate::domain::events::PipelineEvent;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use triage_swarm::{CyclicBehavior, Message, MessageHandler, PatternTemplate, WorkerContext};

pub struct Notifier {
    events: EventBus,
}

impl Notifier {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }

    pub fn into_behavior(self) -> CyclicBehavior<Self> {
        CyclicBehavior::new("deliver-notification", PatternTemplate::any(), self)
    }
}

#[async_trait]
impl MessageHandler for Notifier {
    async fn handle(&mut self, message: Message, ctx: &WorkerContext) {
        let content = String::from_utf8_lossy(message.payload()).into_owned();

        info!(
            worker = %ctx.worker_id(),
            from = %message.sender(),
            performative = %message.performative(),
            content = %content,
            "Notification received"
        );
        metrics::counter!("triage_notifications_total").increment(1);

        self.events.publish(PipelineEvent::NotificationDelivered {
            sender: message.sender().clone(),
            content,
            delivered_at: Utc::now(),
        });
    }
}
