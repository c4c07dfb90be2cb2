//! Broadcast transport binding and echo suppression.
//!
//! DESIGN
//! ======
//! The core talks to one logical publish/subscribe channel per room. The
//! [`Transport`] trait is the seam: anything that can fan an [`Envelope`] out
//! to every subscriber of a room topic qualifies. [`TopicHub`] is the
//! concrete in-process implementation over `tokio::sync::broadcast`, used
//! both in production embeddings and in tests; it carries no business logic.
//!
//! Every outgoing envelope is tagged with the local origin id by
//! [`EchoFilter::tag`], and every inbound envelope passes through
//! [`EchoFilter::admit`], which drops self-echo so a client never reacts to
//! its own broadcast.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::consts::TOPIC_CAPACITY;
use crate::message::{Envelope, OriginId, RoomEvent};

/// A room-scoped publish/subscribe channel.
///
/// Delivery is at-most-once from the core's perspective: there is no
/// application-level ack or retry, and publishing to a topic nobody is
/// subscribed to is not an error.
///
/// Implementations carry typed envelopes. A binding that crosses a process
/// boundary owns the wire codec — [`Envelope::encode`] on publish,
/// [`Envelope::decode`] on receipt — and drops an undecodable message with
/// a warning instead of surfacing it to the session.
pub trait Transport {
    /// Publish an envelope to every current subscriber.
    fn publish(&self, envelope: Envelope);

    /// Open a new subscription receiving every envelope published after
    /// this call, including the local client's own.
    fn subscribe(&self) -> broadcast::Receiver<Envelope>;
}

/// In-process topic registry: one broadcast channel per room name.
#[derive(Clone, Default)]
pub struct TopicHub {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Envelope>>>>,
}

impl TopicHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The topic for `room`, created on first use. Repeated calls with the
    /// same name return handles to the same underlying channel.
    #[must_use]
    pub fn topic(&self, room: &str) -> Topic {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = topics
            .entry(room.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone();
        Topic { tx }
    }
}

/// Handle to one room's broadcast channel.
#[derive(Clone)]
pub struct Topic {
    tx: broadcast::Sender<Envelope>,
}

impl Transport for Topic {
    fn publish(&self, envelope: Envelope) {
        // Err here only means no subscriber is currently listening.
        let _ = self.tx.send(envelope);
    }

    fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

/// Tags outgoing events with the local origin and drops inbound self-echo.
#[derive(Debug, Clone)]
pub struct EchoFilter {
    origin: OriginId,
}

impl EchoFilter {
    /// Build a filter for the given local origin id.
    #[must_use]
    pub fn new(origin: OriginId) -> Self {
        Self { origin }
    }

    /// The local origin id attached to outgoing envelopes.
    #[must_use]
    pub fn origin(&self) -> OriginId {
        self.origin
    }

    /// Wrap an event in an envelope carrying the local origin.
    #[must_use]
    pub fn tag(&self, event: RoomEvent) -> Envelope {
        Envelope { origin: self.origin, event }
    }

    /// Admit a remote envelope, or return `None` if it is our own echo.
    #[must_use]
    pub fn admit(&self, envelope: Envelope) -> Option<(OriginId, RoomEvent)> {
        if envelope.origin == self.origin {
            None
        } else {
            Some((envelope.origin, envelope.event))
        }
    }
}
