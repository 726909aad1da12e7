// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Coordinator
//!
//! Directory of workers plus the transport between their mailboxes.
//!
//! The coordinator owns the shared [`CorrelationRegistry`] and the shutdown
//! token every spawned worker listens on. It is cheap to clone; clones share
//! the same directory, registry and tasks.

use crate::application::correlation_registry::CorrelationRegistry;
use crate::application::scheduler::{Worker, WorkerHandle, DEFAULT_IDLE_BACKOFF};
use crate::domain::{Message, SwarmError, WorkerId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SwarmCoordinator {
    directory: Arc<RwLock<HashMap<WorkerId, WorkerHandle>>>,
    correlations: Arc<CorrelationRegistry>,
    shutdown: CancellationToken,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    idle_backoff: Duration,
}

impl Default for SwarmCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SwarmCoordinator {
    pub fn new() -> Self {
        Self::with_idle_backoff(DEFAULT_IDLE_BACKOFF)
    }

    pub fn with_idle_backoff(idle_backoff: Duration) -> Self {
        Self {
            directory: Arc::new(RwLock::new(HashMap::new())),
            correlations: Arc::new(CorrelationRegistry::new()),
            shutdown: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(Vec::new())),
            idle_backoff,
        }
    }

    /// Create a worker addressable as `id`. Behaviors are added to the
    /// returned worker before it is handed to [`SwarmCoordinator::spawn`].
    pub fn register_worker(&self, id: WorkerId) -> Result<Worker, SwarmError> {
        let mut directory = self.directory.write();
        if directory.contains_key(&id) {
            return Err(SwarmError::WorkerAlreadyRegistered(id));
        }

        let worker = Worker::new(id.clone(), self.clone(), self.idle_backoff);
        directory.insert(id.clone(), worker.handle());
        debug!(worker = %id, "Worker registered");
        Ok(worker)
    }

    /// Run a worker on its own task until shutdown.
    pub fn spawn(&self, worker: Worker) {
        let token = self.shutdown.child_token();
        let task = tokio::spawn(worker.run(token));
        self.tasks.lock().push(task);
    }

    /// Deliver `message` to the mailbox of every receiver.
    ///
    /// Known receivers always get the message. If any receiver is not
    /// registered, the first missing one is reported as `UnknownReceiver`.
    pub fn send(&self, message: Message) -> Result<(), SwarmError> {
        let targets: Vec<(WorkerId, Option<WorkerHandle>)> = {
            let directory = self.directory.read();
            message
                .receivers()
                .iter()
                .map(|id| (id.clone(), directory.get(id).cloned()))
                .collect()
        };

        let mut missing = None;
        for (id, handle) in targets {
            match handle {
                Some(handle) => {
                    debug!(
                        message_id = %message.id(),
                        performative = %message.performative(),
                        sender = %message.sender(),
                        receiver = %id,
                        correlation_id = ?message.correlation_id().map(|c| c.as_str()),
                        "Delivering message"
                    );
                    handle.mailbox().enqueue(message.clone());
                    metrics::counter!(
                        "swarm_messages_delivered_total",
                        "performative" => message.performative().to_string()
                    )
                    .increment(1);
                }
                None => {
                    warn!(
                        message_id = %message.id(),
                        sender = %message.sender(),
                        receiver = %id,
                        "No such worker, message not delivered to it"
                    );
                    metrics::counter!("swarm_messages_undeliverable_total").increment(1);
                    missing.get_or_insert(id);
                }
            }
        }

        match missing {
            Some(id) => Err(SwarmError::UnknownReceiver(id)),
            None => Ok(()),
        }
    }

    pub fn handle(&self, id: &WorkerId) -> Option<WorkerHandle> {
        self.directory.read().get(id).cloned()
    }

    pub fn workers(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.directory.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn correlations(&self) -> &Arc<CorrelationRegistry> {
        &self.correlations
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every spawned worker and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        info!(workers = count, "Swarm shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_worker_rejected() {
        let coordinator = SwarmCoordinator::new();
        let _first = coordinator.register_worker("judge".into()).unwrap();
        let second = coordinator.register_worker("judge".into());
        assert!(matches!(second, Err(SwarmError::WorkerAlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_send_reaches_every_known_receiver() {
        let coordinator = SwarmCoordinator::new();
        let a = coordinator.register_worker("a".into()).unwrap();
        let b = coordinator.register_worker("b".into()).unwrap();

        let message = Message::inform("x".into(), "a".into(), "hi").with_receiver("b".into());
        coordinator.send(message).unwrap();

        assert_eq!(a.handle().mailbox().len(), 1);
        assert_eq!(b.handle().mailbox().len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_unknown_receiver_still_delivers_to_known() {
        let coordinator = SwarmCoordinator::new();
        let a = coordinator.register_worker("a".into()).unwrap();

        let message = Message::inform("x".into(), "a".into(), "hi").with_receiver("ghost".into());
        let result = coordinator.send(message);

        assert_eq!(result, Err(SwarmError::UnknownReceiver("ghost".into())));
        assert_eq!(a.handle().mailbox().len(), 1);
    }

    #[tokio::test]
    async fn test_workers_listed_sorted() {
        let coordinator = SwarmCoordinator::new();
        coordinator.register_worker("notifier".into()).unwrap();
        coordinator.register_worker("classifier".into()).unwrap();
        assert_eq!(
            coordinator.workers(),
            vec![WorkerId::from("classifier"), WorkerId::from("notifier")]
        );
        assert!(coordinator.handle(&"notifier".into()).is_some());
        assert!(coordinator.handle(&"judge".into()).is_none());
    }
}
