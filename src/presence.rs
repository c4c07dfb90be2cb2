//! Presence tracking for room participants.
//!
//! Membership is sourced entirely from presence events on the room topic:
//! participants announce themselves once subscribed and are removed on an
//! explicit leave notification. No heartbeat or timeout logic lives here —
//! disappearance is driven by the transport's own disconnect notification.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use crate::message::{PresenceInfo, RoomEvent};

/// A connected room participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Stable identity.
    pub identity: String,
    /// Human-readable name.
    pub display_name: String,
    /// Local-clock join time in milliseconds since the Unix epoch.
    pub joined_at_ms: i64,
}

/// Roster of connected participants, keyed by identity.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    local_identity: String,
    local_display_name: String,
    local_joined_at_ms: Option<i64>,
    roster: HashMap<String, Participant>,
}

impl PresenceTracker {
    /// Create an empty roster for the local participant.
    #[must_use]
    pub fn new(identity: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            local_identity: identity.into(),
            local_display_name: display_name.into(),
            local_joined_at_ms: None,
            roster: HashMap::new(),
        }
    }

    /// Announce the local participant, inserting it into the roster and
    /// returning the join event to broadcast. Re-announcing (e.g. to greet
    /// a newcomer) keeps the original join time.
    pub fn announce(&mut self, now_ms: i64) -> RoomEvent {
        let joined_at = *self.local_joined_at_ms.get_or_insert(now_ms);
        let info = PresenceInfo {
            identity: self.local_identity.clone(),
            display_name: self.local_display_name.clone(),
            joined_at,
        };
        self.apply_join(&info);
        RoomEvent::PresenceJoin(info)
    }

    /// The leave event to broadcast on teardown.
    #[must_use]
    pub fn depart(&self) -> RoomEvent {
        RoomEvent::PresenceLeave { identity: self.local_identity.clone() }
    }

    /// Record a join announcement. Returns `true` when the identity was not
    /// already in the roster, so the caller can answer a newcomer with its
    /// own announcement exactly once.
    pub fn apply_join(&mut self, info: &PresenceInfo) -> bool {
        self.roster
            .insert(
                info.identity.clone(),
                Participant {
                    identity: info.identity.clone(),
                    display_name: info.display_name.clone(),
                    joined_at_ms: info.joined_at,
                },
            )
            .is_none()
    }

    /// Remove a participant on an explicit leave notification.
    pub fn apply_leave(&mut self, identity: &str) {
        self.roster.remove(identity);
    }

    /// All participants, ordered by join time then identity.
    #[must_use]
    pub fn participants(&self) -> Vec<&Participant> {
        let mut all: Vec<&Participant> = self.roster.values().collect();
        all.sort_by(|a, b| {
            a.joined_at_ms
                .cmp(&b.joined_at_ms)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        all
    }

    /// Number of known participants (including the local one once
    /// announced).
    #[must_use]
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Whether `identity` is currently in the roster.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.roster.contains_key(identity)
    }
}
