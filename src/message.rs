//! Wire model — the envelope and event types every client exchanges.
//!
//! ARCHITECTURE
//! ============
//! Every communication in a room is an [`Envelope`]: an origin identifier
//! plus one [`RoomEvent`]. Clients publish envelopes to the room topic and
//! react to the envelopes of their peers; the origin id exists solely so a
//! client can drop its own echo. Only serialized copies cross the transport
//! boundary — no entity is shared by reference across clients.

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;

/// Per-client random identifier attached to every outgoing envelope.
pub type OriginId = Uuid;

/// A single message on the room topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifier of the client that published this envelope.
    pub origin: OriginId,
    /// The event payload.
    #[serde(flatten)]
    pub event: RoomEvent,
}

impl Envelope {
    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] if serialization fails (does not happen
    /// for well-formed events in practice).
    pub fn encode(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] for malformed input; callers drop the
    /// message with a warning rather than crashing the event loop.
    pub fn decode(raw: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Event types carried over the room topic.
///
/// Tag values are the wire event names; peers on other stacks match on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RoomEvent {
    /// Playback state changed (play/pause/seek or periodic time sync).
    #[serde(rename = "playback-update")]
    PlaybackUpdate(PlaybackUpdate),
    /// A newly connected participant asks peers for the current state.
    #[serde(rename = "request-state")]
    RequestState,
    /// Reply to `request-state` carrying the responder's playback state.
    #[serde(rename = "send-state")]
    SendState(PlaybackUpdate),
    /// A single in-progress pointer sample, for live remote ink feedback.
    Draw(LivePoint),
    /// An ordered group of pointer samples logged as one replayable unit.
    DrawBatch(StrokeBatch),
    /// The drawing surface and stroke log were cleared.
    Clear,
    /// A participant announced itself after subscribing.
    #[serde(rename = "presence-join")]
    PresenceJoin(PresenceInfo),
    /// A participant left the room.
    #[serde(rename = "presence-leave")]
    PresenceLeave {
        /// Identity of the departing participant.
        identity: String,
    },
}

/// Shared playback state as broadcast between clients and persisted in the
/// external store's room row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackUpdate {
    /// Opaque identifier of the media being played, if any is loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Whether playback is running.
    pub is_playing: bool,
    /// Playback position in seconds.
    pub playback_time: f64,
}

/// Position of a pointer sample within a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Begins a new sub-path.
    Start,
    /// Continues the current sub-path.
    Move,
}

/// One pointer sample, always part of an ordered sequence forming a single
/// continuous path segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    /// Whether this sample starts a sub-path or extends it.
    #[serde(rename = "type")]
    pub kind: PointKind,
    /// Horizontal position in surface coordinates.
    pub x: f64,
    /// Vertical position in surface coordinates.
    pub y: f64,
}

impl StrokePoint {
    /// A sample that begins a new sub-path.
    #[must_use]
    pub fn start(x: f64, y: f64) -> Self {
        Self { kind: PointKind::Start, x, y }
    }

    /// A sample that extends the current sub-path.
    #[must_use]
    pub fn move_to(x: f64, y: f64) -> Self {
        Self { kind: PointKind::Move, x, y }
    }
}

/// Which drawing tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Normal source-over painting with the stroke's declared color.
    #[default]
    Pen,
    /// Destructive alpha-erasing compositing for the duration of the stroke.
    Eraser,
}

/// Visual attributes shared by every point of a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// CSS color string.
    pub color: String,
    /// Pen or eraser.
    pub tool: Tool,
    /// Stroke width in surface pixels.
    pub size: f64,
}

/// An ordered group of pointer samples broadcast and logged as one
/// replayable drawing unit. Immutable after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeBatch {
    /// Samples drawn as one polyline in the order given; a `start` point
    /// always begins a new sub-path.
    pub points: Vec<StrokePoint>,
    /// Color, tool, and width for the whole batch.
    pub style: StrokeStyle,
    /// Client that produced the batch.
    pub origin: OriginId,
}

/// A single pointer sample plus its style, sent out-of-band alongside batch
/// flushes so peers can render live ink without waiting for the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePoint {
    /// The sample itself.
    pub point: StrokePoint,
    /// Style of the stroke the sample belongs to.
    pub style: StrokeStyle,
}

/// Presence announcement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceInfo {
    /// Stable identity of the participant.
    pub identity: String,
    /// Human-readable name shown in the roster.
    pub display_name: String,
    /// Milliseconds since the Unix epoch at the participant's local clock
    /// when it joined.
    pub joined_at: i64,
}
