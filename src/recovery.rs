//! Late-joiner recovery coordination.
//!
//! DESIGN
//! ======
//! A newly connected client must not broadcast its own stale defaults over
//! the authoritative room state. The coordinator is an explicit phase
//! machine: the session subscribes to the topic first, then [`begin`]
//! produces the one `request-state` publish while the store fetch runs, and
//! [`complete`] seeds both state machines from whichever snapshot arrives
//! and only then enables outgoing propagation on them.
//!
//! A peer's `send-state` reply may land before the store fetch resolves;
//! [`apply_send_state`] seeds playback early while staying in `Seeding`, and
//! the later store snapshot reconciles through the normal drift threshold.
//!
//! [`begin`]: RecoveryCoordinator::begin
//! [`complete`]: RecoveryCoordinator::complete
//! [`apply_send_state`]: RecoveryCoordinator::apply_send_state

#[cfg(test)]
#[path = "recovery_test.rs"]
mod recovery_test;

use crate::drawing::{DrawingSync, PaintOp};
use crate::message::{PlaybackUpdate, RoomEvent, StrokeBatch};
use crate::playback::{PlaybackEffect, PlaybackSync};

/// Where the client is in its one-time recovery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPhase {
    /// Subscribed, state request not yet sent.
    #[default]
    Connecting,
    /// State requested; waiting for the store snapshot and/or peer replies.
    Seeding,
    /// Seeded; outgoing propagation enabled.
    Live,
}

/// Authoritative state fetched from the external store on connect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Ordered stroke history for the room.
    pub strokes: Vec<StrokeBatch>,
    /// Last known playback row, if one exists.
    pub playback: Option<PlaybackUpdate>,
}

/// Effects produced by seeding the two state machines.
#[derive(Debug, Clone, Default)]
pub struct SeedEffects {
    /// Ops that paint the seeded stroke history.
    pub paint: Vec<PaintOp>,
    /// Playback effects (surface seek/play) from the seeded row.
    pub playback: Vec<PlaybackEffect>,
}

/// One-shot coordinator for the connect sequence.
#[derive(Debug, Clone, Default)]
pub struct RecoveryCoordinator {
    phase: RecoveryPhase,
}

impl RecoveryCoordinator {
    /// Start in `Connecting`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// Whether recovery finished and outgoing propagation is enabled.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.phase == RecoveryPhase::Live
    }

    /// Move to `Seeding` and return the state-request event to broadcast.
    /// Must be called only after the topic subscription is open, so no
    /// reply can be missed.
    pub fn begin(&mut self) -> RoomEvent {
        self.phase = RecoveryPhase::Seeding;
        RoomEvent::RequestState
    }

    /// A peer answered the state request. Seeds playback while still
    /// seeding; once live this is handled as an ordinary remote update by
    /// the caller.
    pub fn apply_send_state(
        &mut self,
        playback: &mut PlaybackSync,
        update: &PlaybackUpdate,
        now_ms: i64,
    ) -> Vec<PlaybackEffect> {
        if self.phase == RecoveryPhase::Live {
            return Vec::new();
        }
        playback.seed(update, now_ms)
    }

    /// Seed both machines from the store snapshot and enable outgoing
    /// propagation. Idempotent guard: a second completion is ignored so a
    /// late store response cannot clobber live state.
    pub fn complete(
        &mut self,
        snapshot: Snapshot,
        playback: &mut PlaybackSync,
        drawing: &mut DrawingSync,
        now_ms: i64,
    ) -> SeedEffects {
        if self.phase == RecoveryPhase::Live {
            return SeedEffects::default();
        }

        let paint = if snapshot.strokes.is_empty() {
            Vec::new()
        } else {
            drawing.seed(snapshot.strokes)
        };
        let playback_effects = match snapshot.playback {
            Some(ref row) => playback.seed(row, now_ms),
            None => Vec::new(),
        };

        self.phase = RecoveryPhase::Live;
        playback.set_live(true);
        drawing.set_live(true);

        SeedEffects { paint, playback: playback_effects }
    }
}
