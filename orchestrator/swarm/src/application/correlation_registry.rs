// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Correlation Registry
//!
//! Tracks outstanding request → reply expectations keyed by correlation id.
//! Shared by every worker of a swarm, hence internally synchronized.
//!
//! ## Lifecycle
//!
//! ```text
//! register ──► PENDING ──resolve(expected sender)──► FULFILLED (discarded)
//!                 │
//!                 └──expire / expire_older_than──► EXPIRED (discarded)
//! ```
//!
//! The registry never retries and never fires timeouts on its own. `expire`
//! is the hook a higher layer uses to add a timeout or retry policy; when a
//! reply-waiter behavior is attached to the entry, expiring it also removes
//! that behavior from its worker.

use crate::application::scheduler::BehaviorHandle;
use crate::domain::{CorrelationEntry, CorrelationId, CorrelationState, SwarmError, WorkerId};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

struct Tracked {
    entry: CorrelationEntry,
    waiter: Option<BehaviorHandle>,
}

#[derive(Default)]
pub struct CorrelationRegistry {
    entries: Mutex<HashMap<CorrelationId, Tracked>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending expectation of a reply from `expected_replier`.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        expected_replier: WorkerId,
    ) -> Result<(), SwarmError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&correlation_id) {
            return Err(SwarmError::DuplicateCorrelationId(correlation_id));
        }

        debug!(
            correlation_id = %correlation_id,
            expected_replier = %expected_replier,
            "Correlation registered"
        );
        entries.insert(
            correlation_id.clone(),
            Tracked {
                entry: CorrelationEntry::pending(correlation_id, expected_replier),
                waiter: None,
            },
        );
        metrics::counter!("swarm_correlations_registered_total").increment(1);
        Ok(())
    }

    /// Attach the behavior waiting for this reply, so `expire` can cancel it.
    pub fn attach_waiter(
        &self,
        correlation_id: &CorrelationId,
        waiter: BehaviorHandle,
    ) -> Result<(), SwarmError> {
        let mut entries = self.entries.lock();
        let tracked = entries
            .get_mut(correlation_id)
            .ok_or_else(|| SwarmError::UnknownCorrelationId(correlation_id.clone()))?;
        tracked.waiter = Some(waiter);
        Ok(())
    }

    /// Validate a reply's sender and fulfil the entry.
    ///
    /// On `UnexpectedReplier` the entry stays pending. On success the entry is
    /// discarded and returned in the `Fulfilled` state; a second call for the
    /// same id fails with `UnknownCorrelationId`.
    pub fn resolve(
        &self,
        correlation_id: &CorrelationId,
        actual_sender: &WorkerId,
    ) -> Result<CorrelationEntry, SwarmError> {
        let mut entries = self.entries.lock();
        let tracked = entries
            .get(correlation_id)
            .ok_or_else(|| SwarmError::UnknownCorrelationId(correlation_id.clone()))?;

        if &tracked.entry.expected_replier != actual_sender {
            return Err(SwarmError::UnexpectedReplier {
                correlation_id: correlation_id.clone(),
                expected: tracked.entry.expected_replier.clone(),
                actual: actual_sender.clone(),
            });
        }

        let Some(Tracked { mut entry, .. }) = entries.remove(correlation_id) else {
            return Err(SwarmError::UnknownCorrelationId(correlation_id.clone()));
        };
        entry.state = CorrelationState::Fulfilled;

        let waited_ms = (Utc::now() - entry.created_at).num_milliseconds().max(0) as f64;
        metrics::histogram!("swarm_correlation_wait_ms").record(waited_ms);
        metrics::counter!("swarm_correlations_fulfilled_total").increment(1);
        info!(
            correlation_id = %correlation_id,
            replier = %actual_sender,
            waited_ms,
            "Correlation fulfilled"
        );
        Ok(entry)
    }

    /// Abandon a pending expectation. Idempotent: returns `None` when the id
    /// is unknown or already resolved.
    pub fn expire(&self, correlation_id: &CorrelationId) -> Option<CorrelationEntry> {
        let tracked = self.entries.lock().remove(correlation_id)?;
        Some(Self::finish_expired(tracked))
    }

    /// Expire every pending entry older than `max_age`.
    pub fn expire_older_than(&self, max_age: Duration) -> Vec<CorrelationEntry> {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now() - max_age;

        let stale: Vec<Tracked> = {
            let mut entries = self.entries.lock();
            let ids: Vec<CorrelationId> = entries
                .iter()
                .filter(|(_, tracked)| tracked.entry.created_at <= cutoff)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };

        stale.into_iter().map(Self::finish_expired).collect()
    }

    // Runs outside the lock: cancelling a waiter talks to its worker.
    fn finish_expired(tracked: Tracked) -> CorrelationEntry {
        let Tracked { mut entry, waiter } = tracked;
        entry.state = CorrelationState::Expired;
        if let Some(waiter) = waiter {
            waiter.cancel();
        }
        metrics::counter!("swarm_correlations_expired_total").increment(1);
        warn!(
            correlation_id = %entry.correlation_id,
            expected_replier = %entry.expected_replier,
            "Correlation expired without a reply"
        );
        entry
    }

    pub fn get(&self, correlation_id: &CorrelationId) -> Option<CorrelationEntry> {
        self.entries
            .lock()
            .get(correlation_id)
            .map(|tracked| tracked.entry.clone())
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::behavior::{MessageHandler, ReplyWaiter};
    use crate::application::coordinator::SwarmCoordinator;
    use crate::application::scheduler::WorkerContext;
    use crate::domain::Message;
    use async_trait::async_trait;

    fn id(value: &str) -> CorrelationId {
        CorrelationId::from(value)
    }

    #[test]
    fn test_register_then_resolve_round_trip() {
        let registry = CorrelationRegistry::new();
        registry.register(id("c1"), "explainer".into()).unwrap();

        let entry = registry.resolve(&id("c1"), &"explainer".into()).unwrap();
        assert_eq!(entry.state, CorrelationState::Fulfilled);
        assert_eq!(entry.expected_replier, WorkerId::from("explainer"));

        let second = registry.resolve(&id("c1"), &"explainer".into());
        assert_eq!(second, Err(SwarmError::UnknownCorrelationId(id("c1"))));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_unexpected_replier_leaves_entry_pending() {
        let registry = CorrelationRegistry::new();
        registry.register(id("c2"), "explainer".into()).unwrap();

        let err = registry.resolve(&id("c2"), &"intruder".into()).unwrap_err();
        assert!(matches!(err, SwarmError::UnexpectedReplier { .. }));

        let entry = registry.get(&id("c2")).unwrap();
        assert_eq!(entry.state, CorrelationState::Pending);
        assert!(registry.resolve(&id("c2"), &"explainer".into()).is_ok());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = CorrelationRegistry::new();
        registry.register(id("c3"), "explainer".into()).unwrap();
        assert_eq!(
            registry.register(id("c3"), "other".into()),
            Err(SwarmError::DuplicateCorrelationId(id("c3")))
        );

        // once resolved the id may be reused
        registry.resolve(&id("c3"), &"explainer".into()).unwrap();
        assert!(registry.register(id("c3"), "explainer".into()).is_ok());
    }

    #[test]
    fn test_expire_is_idempotent() {
        let registry = CorrelationRegistry::new();
        registry.register(id("c4"), "explainer".into()).unwrap();

        let expired = registry.expire(&id("c4")).unwrap();
        assert_eq!(expired.state, CorrelationState::Expired);
        assert!(registry.expire(&id("c4")).is_none());
        assert!(registry.expire(&id("never")).is_none());
        assert!(registry.resolve(&id("c4"), &"explainer".into()).is_err());
    }

    #[test]
    fn test_expire_older_than_only_touches_stale_entries() {
        let registry = CorrelationRegistry::new();
        registry.register(id("old"), "explainer".into()).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        registry.register(id("fresh"), "explainer".into()).unwrap();

        let expired = registry.expire_older_than(Duration::from_millis(20));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].correlation_id, id("old"));
        assert!(registry.get(&id("fresh")).is_some());
    }

    struct Ignore;

    #[async_trait]
    impl MessageHandler for Ignore {
        async fn handle(&mut self, _message: Message, _ctx: &WorkerContext) {}
    }

    #[tokio::test]
    async fn test_expire_cancels_attached_waiter() {
        let coordinator = SwarmCoordinator::new();
        let mut judge = coordinator.register_worker("judge".into()).unwrap();
        let registry = coordinator.correlations().clone();

        registry.register(id("c5"), "explainer".into()).unwrap();
        let waiter = judge
            .context()
            .add_behavior(ReplyWaiter::new(id("c5"), "explainer".into(), Ignore));
        registry.attach_waiter(&id("c5"), waiter).unwrap();

        judge.tick().await;
        assert_eq!(judge.behavior_count(), 1);

        registry.expire(&id("c5"));
        judge.tick().await;
        assert_eq!(judge.behavior_count(), 0);

        // a late reply now stays unread in the mailbox
        judge.handle().mailbox().enqueue(
            Message::inform("explainer".into(), "judge".into(), "late").with_correlation_id(id("c5")),
        );
        judge.tick().await;
        assert_eq!(judge.handle().mailbox().len(), 1);
    }
}
