// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Mailbox
//!
//! Per-worker unbounded inbox with pattern-based selective receive.
//!
//! - [`Mailbox::enqueue`] appends to the tail. It never blocks and never fails.
//! - [`Mailbox::try_match`] removes and returns the *first* entry (from the
//!   head) matching a template, leaving every other entry in its original
//!   relative order. It returns `None` immediately when nothing matches.
//!   [`Mailbox::try_match_where`] does the same for a free-form predicate.
//!
//! Because the scan always starts at the head, two entries that match the same
//! template are handed out in arrival order (FIFO per pattern).
//!
//! The mailbox is the only structure shared between the owning worker and its
//! senders, so it carries its own lock. Bounding and backpressure are out of
//! scope: a mailbox grows until memory runs out.

use crate::domain::{MailboxEntry, Message, PatternTemplate, WorkerId};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug, Default)]
struct MailboxInner {
    entries: VecDeque<MailboxEntry>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct Mailbox {
    owner: WorkerId,
    inner: Mutex<MailboxInner>,
    arrivals: Notify,
}

impl Mailbox {
    pub fn new(owner: WorkerId) -> Self {
        Self {
            owner,
            inner: Mutex::new(MailboxInner::default()),
            arrivals: Notify::new(),
        }
    }

    pub fn owner(&self) -> &WorkerId {
        &self.owner
    }

    /// Append a message to the tail and wake the owning worker.
    pub fn enqueue(&self, message: Message) {
        let seq = {
            let mut inner = self.inner.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.entries.push_back(MailboxEntry {
                seq,
                enqueued_at: Utc::now(),
                message,
            });
            seq
        };
        trace!(worker = %self.owner, seq, "Message enqueued");
        // notify_one stores a permit when nobody is waiting, so an arrival
        // between a failed scan and the wait is never lost.
        self.arrivals.notify_one();
    }

    /// Remove and return the first message matching `template`, if any.
    pub fn try_match(&self, template: &PatternTemplate) -> Option<Message> {
        self.try_match_where(|message| template.matches(message))
    }

    /// Like [`Mailbox::try_match`] with an arbitrary predicate.
    ///
    /// The predicate runs under the mailbox lock and must not touch this
    /// mailbox.
    pub fn try_match_where<F>(&self, predicate: F) -> Option<Message>
    where
        F: Fn(&Message) -> bool,
    {
        let mut inner = self.inner.lock();
        let position = inner
            .entries
            .iter()
            .position(|entry| predicate(&entry.message))?;
        inner.entries.remove(position).map(|entry| entry.message)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Copy of the current entries in arrival order, for diagnostics.
    pub fn snapshot(&self) -> Vec<MailboxEntry> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    /// Resolves once a message has arrived since the last call.
    pub async fn notified(&self) {
        self.arrivals.notified().await;
    }
}
