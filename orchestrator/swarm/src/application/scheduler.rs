// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Behavior Scheduler
//!
//! A [`Worker`] multiplexes its behaviors cooperatively on a single task:
//! behaviors take turns in round-robin order and never run concurrently
//! against the same mailbox, so worker-local state needs no locking.
//!
//! ## Loop
//!
//! 1. [`Worker::tick`] gives every scheduled behavior exactly one turn.
//!    Add/remove commands queued through a [`WorkerHandle`] (including from a
//!    behavior's own action) are applied after every turn, so they take effect
//!    before the affected behavior's next turn.
//! 2. When a whole round was idle, [`Worker::run`] suspends until a message
//!    arrives, a control command arrives, the idle backoff elapses, or
//!    shutdown is requested. The backoff bounds latency well under a second
//!    without spinning.

use crate::application::behavior::{Behavior, BehaviorStatus};
use crate::application::correlation_registry::CorrelationRegistry;
use crate::application::coordinator::SwarmCoordinator;
use crate::application::mailbox::Mailbox;
use crate::domain::{Message, SwarmError, WorkerId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Default suspension when a full round found nothing to do.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BehaviorId(pub Uuid);

impl BehaviorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BehaviorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) enum SchedulerCommand {
    Add(BehaviorId, Box<dyn Behavior>),
    Remove(BehaviorId),
}

/// Cloneable control handle of a worker: its address, mailbox and
/// behavior-management queue.
#[derive(Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    mailbox: Arc<Mailbox>,
    commands: mpsc::UnboundedSender<SchedulerCommand>,
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("queued_messages", &self.mailbox.len())
            .finish()
    }
}

impl WorkerHandle {
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Schedule a behavior; it gets its first turn in the next round.
    pub fn add_behavior(&self, behavior: Box<dyn Behavior>) -> BehaviorId {
        let id = BehaviorId::new();
        if self.commands.send(SchedulerCommand::Add(id, behavior)).is_err() {
            debug!(worker = %self.id, behavior_id = %id, "Worker stopped, behavior not scheduled");
        }
        id
    }

    /// Unschedule a behavior. Unknown or already-finished ids are ignored.
    pub fn remove_behavior(&self, id: BehaviorId) {
        if self.commands.send(SchedulerCommand::Remove(id)).is_err() {
            debug!(worker = %self.id, behavior_id = %id, "Worker stopped, nothing to remove");
        }
    }
}

/// A behavior scheduled on a specific worker. Lets a supervisor (e.g. the
/// correlation registry's `expire`) cancel it from outside.
#[derive(Debug, Clone)]
pub struct BehaviorHandle {
    pub worker: WorkerHandle,
    pub behavior: BehaviorId,
}

impl BehaviorHandle {
    pub fn cancel(&self) {
        self.worker.remove_behavior(self.behavior);
    }
}

/// Everything a behavior may touch while it runs.
#[derive(Clone)]
pub struct WorkerContext {
    handle: WorkerHandle,
    coordinator: SwarmCoordinator,
}

impl WorkerContext {
    pub(crate) fn new(handle: WorkerHandle, coordinator: SwarmCoordinator) -> Self {
        Self { handle, coordinator }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.handle.id
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.handle.mailbox
    }

    pub fn handle(&self) -> &WorkerHandle {
        &self.handle
    }

    pub fn correlations(&self) -> &Arc<CorrelationRegistry> {
        self.coordinator.correlations()
    }

    pub fn coordinator(&self) -> &SwarmCoordinator {
        &self.coordinator
    }

    /// Deliver a message to every receiver's mailbox.
    pub fn send(&self, message: Message) -> Result<(), SwarmError> {
        self.coordinator.send(message)
    }

    pub fn add_behavior<B: Behavior + 'static>(&self, behavior: B) -> BehaviorHandle {
        let id = self.handle.add_behavior(Box::new(behavior));
        BehaviorHandle {
            worker: self.handle.clone(),
            behavior: id,
        }
    }

    pub fn remove_behavior(&self, id: BehaviorId) {
        self.handle.remove_behavior(id);
    }
}

struct ScheduledBehavior {
    id: BehaviorId,
    behavior: Box<dyn Behavior>,
}

/// Result of one scheduling round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Behaviors that got a turn.
    pub turns: usize,
    /// Turns that consumed a message.
    pub matched: usize,
    /// Behaviors that finished during the round.
    pub finished: usize,
}

impl TickOutcome {
    pub fn is_idle(&self) -> bool {
        self.matched == 0
    }
}

enum Wake {
    Shutdown,
    Arrival,
    Command(Option<SchedulerCommand>),
    Timeout,
}

pub struct Worker {
    handle: WorkerHandle,
    context: WorkerContext,
    behaviors: Vec<ScheduledBehavior>,
    commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    idle_backoff: Duration,
}

impl Worker {
    pub(crate) fn new(id: WorkerId, coordinator: SwarmCoordinator, idle_backoff: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = WorkerHandle {
            mailbox: Arc::new(Mailbox::new(id.clone())),
            id,
            commands: tx,
        };
        let context = WorkerContext::new(handle.clone(), coordinator);
        Self {
            handle,
            context,
            behaviors: Vec::new(),
            commands: rx,
            idle_backoff,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.handle.id
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    pub fn context(&self) -> &WorkerContext {
        &self.context
    }

    /// Schedule a behavior during setup, before the worker runs.
    pub fn add_behavior<B: Behavior + 'static>(&mut self, behavior: B) -> BehaviorId {
        let id = BehaviorId::new();
        self.behaviors.push(ScheduledBehavior {
            id,
            behavior: Box::new(behavior),
        });
        id
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    pub fn behavior_names(&self) -> Vec<String> {
        self.behaviors
            .iter()
            .map(|s| s.behavior.name().to_string())
            .collect()
    }

    /// Give every scheduled behavior one turn.
    pub async fn tick(&mut self) -> TickOutcome {
        self.drain_commands();

        let round: Vec<BehaviorId> = self.behaviors.iter().map(|s| s.id).collect();
        let mut outcome = TickOutcome::default();

        for id in round {
            // removed by an earlier turn of this round
            let Some(slot) = self.behaviors.iter_mut().find(|s| s.id == id) else {
                continue;
            };

            let status = slot.behavior.action(&self.context).await;
            outcome.turns += 1;

            match status {
                BehaviorStatus::Idle => {}
                BehaviorStatus::Progressed => outcome.matched += 1,
                BehaviorStatus::Done => {
                    outcome.matched += 1;
                    outcome.finished += 1;
                    self.remove(id);
                }
            }

            self.drain_commands();
        }

        outcome
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            worker = %self.handle.id,
            behaviors = ?self.behavior_names(),
            "Worker started"
        );
        let mailbox = self.handle.mailbox.clone();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let outcome = self.tick().await;
            if !outcome.is_idle() {
                tokio::task::yield_now().await;
                continue;
            }

            let wake = tokio::select! {
                _ = shutdown.cancelled() => Wake::Shutdown,
                _ = mailbox.notified() => Wake::Arrival,
                command = self.commands.recv() => Wake::Command(command),
                _ = tokio::time::sleep(self.idle_backoff) => Wake::Timeout,
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Command(Some(command)) => self.apply(command),
                Wake::Command(None) | Wake::Arrival | Wake::Timeout => {}
            }
        }

        info!(
            worker = %self.handle.id,
            unread_messages = mailbox.len(),
            "Worker stopped"
        );
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: SchedulerCommand) {
        match command {
            SchedulerCommand::Add(id, behavior) => {
                debug!(worker = %self.handle.id, behavior = behavior.name(), "Behavior added");
                self.behaviors.push(ScheduledBehavior { id, behavior });
            }
            SchedulerCommand::Remove(id) => self.remove(id),
        }
    }

    fn remove(&mut self, id: BehaviorId) {
        if let Some(position) = self.behaviors.iter().position(|s| s.id == id) {
            let removed = self.behaviors.remove(position);
            debug!(worker = %self.handle.id, behavior = removed.behavior.name(), "Behavior removed");
        }
    }
}
