// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Behaviors
//!
//! A behavior is a named, resumable unit of work owned by exactly one worker.
//! Each turn it polls the worker's mailbox once; when nothing matches it
//! reports [`BehaviorStatus::Idle`] and the scheduler moves on.
//!
//! Two kinds are provided:
//!
//! | Kind | Lifetime | Template |
//! |------|----------|----------|
//! | [`CyclicBehavior`] | until removed | fixed, supplied at construction |
//! | [`ReplyWaiter`] | one reply | the awaited correlation id and sender |
//!
//! The work done on a match lives in a [`MessageHandler`], so the same
//! handler type can back either kind.

use crate::application::scheduler::WorkerContext;
use crate::domain::{CorrelationId, Message, PatternTemplate, SwarmError, WorkerId};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Outcome of one behavior turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorStatus {
    /// Nothing matched; yield to the next behavior.
    Idle,
    /// A message was consumed; keep the behavior scheduled.
    Progressed,
    /// A message was consumed and the behavior is finished; remove it.
    Done,
}

#[async_trait]
pub trait Behavior: Send {
    fn name(&self) -> &str;

    /// Run one turn. Must not loop waiting for messages.
    async fn action(&mut self, ctx: &WorkerContext) -> BehaviorStatus;
}

/// Action executed when a behavior's template matches.
///
/// A handler may block its own worker (e.g. on an external call) but never
/// another worker.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, message: Message, ctx: &WorkerContext);
}

/// Behavior that runs forever against a fixed template.
pub struct CyclicBehavior<H> {
    name: String,
    template: PatternTemplate,
    handler: H,
}

impl<H: MessageHandler> CyclicBehavior<H> {
    pub fn new(name: impl Into<String>, template: PatternTemplate, handler: H) -> Self {
        Self {
            name: name.into(),
            template,
            handler,
        }
    }

}

#[async_trait]
impl<H: MessageHandler> Behavior for CyclicBehavior<H> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn action(&mut self, ctx: &WorkerContext) -> BehaviorStatus {
        match ctx.mailbox().try_match(&self.template) {
            Some(message) => {
                debug!(
                    worker = %ctx.worker_id(),
                    behavior = %self.name,
                    message_id = %message.id(),
                    performative = %message.performative(),
                    sender = %message.sender(),
                    "Behavior matched message"
                );
                self.handler.handle(message, ctx).await;
                BehaviorStatus::Progressed
            }
            None => BehaviorStatus::Idle,
        }
    }
}

/// One-shot behavior waiting for the reply to a tracked request.
///
/// The template selects on the correlation id *and* the expected sender, so a
/// message from anyone else is never taken out of the mailbox. On a match the
/// correlation is resolved in the shared registry:
///
/// - resolved: the handler runs and the waiter removes itself, so a second
///   message carrying the same correlation id is never delivered to it;
/// - `UnexpectedReplier`: the registry disagrees about the replier; the
///   message is logged and the waiter keeps waiting;
/// - `UnknownCorrelationId`: the entry was expired meanwhile; the waiter
///   removes itself without running the handler.
pub struct ReplyWaiter<H> {
    name: String,
    correlation_id: CorrelationId,
    template: PatternTemplate,
    handler: H,
}

impl<H: MessageHandler> ReplyWaiter<H> {
    pub fn new(correlation_id: CorrelationId, expected_sender: WorkerId, handler: H) -> Self {
        let template = PatternTemplate::any()
            .correlation_id(correlation_id.clone())
            .sender(expected_sender);
        Self {
            name: format!("reply-waiter:{}", correlation_id),
            correlation_id,
            template,
            handler,
        }
    }
}

#[async_trait]
impl<H: MessageHandler> Behavior for ReplyWaiter<H> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn action(&mut self, ctx: &WorkerContext) -> BehaviorStatus {
        let Some(reply) = ctx.mailbox().try_match(&self.template) else {
            return BehaviorStatus::Idle;
        };

        match ctx.correlations().resolve(&self.correlation_id, reply.sender()) {
            Ok(_) => {
                self.handler.handle(reply, ctx).await;
                BehaviorStatus::Done
            }
            Err(SwarmError::UnexpectedReplier { expected, actual, .. }) => {
                warn!(
                    worker = %ctx.worker_id(),
                    correlation_id = %self.correlation_id,
                    expected = %expected,
                    actual = %actual,
                    "Reply rejected by the registry, still waiting"
                );
                BehaviorStatus::Progressed
            }
            Err(e) => {
                debug!(
                    worker = %ctx.worker_id(),
                    correlation_id = %self.correlation_id,
                    error = %e,
                    "Reply arrived for a correlation that is no longer pending"
                );
                BehaviorStatus::Done
            }
        }
    }
}
