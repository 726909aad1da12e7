// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0
//! # Message Envelope (Swarm Domain)
//!
//! Immutable speech-act envelope exchanged between workers:
//!
//! - [`WorkerId`]: local address of a worker, unique within the process.
//! - [`Performative`]: REQUEST / INFORM / FAILURE intent tag.
//! - [`CorrelationId`]: token linking a request to its eventual reply.
//! - [`Message`]: the envelope itself. Fields are private; once built a
//!   message is never mutated. A reply is a *new* message built with
//!   [`Message::reply`].
//! - [`MailboxEntry`]: a message plus its arrival sequence number.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Local address of a worker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Speech-act tag of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Performative {
    /// "Do this work."
    Request,
    /// "Here is a result."
    Inform,
    /// "The work could not complete; here is why."
    Failure,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Performative::Request => "REQUEST",
            Performative::Inform => "INFORM",
            Performative::Failure => "FAILURE",
        };
        f.write_str(label)
    }
}

/// Opaque token set by a requester and echoed by the replier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id of the form `{prefix}-{uuid}`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier of a single message, used in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable message envelope.
///
/// # Invariants
///
/// - `receivers` is never empty.
/// - No method mutates a built message; the `with_*` builders consume `self`
///   and are only usable before the message is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: MessageId,
    performative: Performative,
    sender: WorkerId,
    receivers: BTreeSet<WorkerId>,
    correlation_id: Option<CorrelationId>,
    payload: Bytes,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        performative: Performative,
        sender: WorkerId,
        receiver: WorkerId,
        payload: impl Into<Bytes>,
    ) -> Self {
        let mut receivers = BTreeSet::new();
        receivers.insert(receiver);
        Self {
            id: MessageId::new(),
            performative,
            sender,
            receivers,
            correlation_id: None,
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    pub fn request(sender: WorkerId, receiver: WorkerId, payload: impl Into<Bytes>) -> Self {
        Self::new(Performative::Request, sender, receiver, payload)
    }

    pub fn inform(sender: WorkerId, receiver: WorkerId, payload: impl Into<Bytes>) -> Self {
        Self::new(Performative::Inform, sender, receiver, payload)
    }

    pub fn failure(sender: WorkerId, receiver: WorkerId, payload: impl Into<Bytes>) -> Self {
        Self::new(Performative::Failure, sender, receiver, payload)
    }

    /// Add another receiver (broadcast).
    pub fn with_receiver(mut self, receiver: WorkerId) -> Self {
        self.receivers.insert(receiver);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Build the reply to this message.
    ///
    /// The reply is addressed to exactly `{self.sender}` and echoes this
    /// message's correlation id.
    pub fn reply(
        &self,
        replier: WorkerId,
        performative: Performative,
        payload: impl Into<Bytes>,
    ) -> Message {
        let mut reply = Message::new(performative, replier, self.sender.clone(), payload);
        reply.correlation_id = self.correlation_id.clone();
        reply
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn performative(&self) -> Performative {
        self.performative
    }

    pub fn sender(&self) -> &WorkerId {
        &self.sender
    }

    pub fn receivers(&self) -> &BTreeSet<WorkerId> {
        &self.receivers
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Deserialize the payload as JSON.
    pub fn payload_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A message stored in a mailbox, stamped on arrival.
#[derive(Debug, Clone)]
pub struct MailboxEntry {
    /// Per-mailbox arrival sequence, strictly increasing.
    pub seq: u64,
    pub enqueued_at: DateTime<Utc>,
    pub message: Message,
}
