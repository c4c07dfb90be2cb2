//! Playback synchronization state machine.
//!
//! DESIGN
//! ======
//! Owns the canonical-for-this-client playback state and reconciles it
//! against remote updates. All operations are pure: they mutate owned state
//! and return [`PlaybackEffect`] values for the host to apply — the machine
//! never touches the player or the network itself, and UI-facing effects are
//! only acted on after the mutation completes.
//!
//! Reconciliation trades perfect synchrony for stability:
//! - The remote play/pause flag is authoritative immediately.
//! - The remote time value is approximate, corrected only when drift exceeds
//!   [`SEEK_THRESHOLD_SECS`]; otherwise every heartbeat would micro-seek.
//! - Outgoing heartbeats are throttled to one per [`HEARTBEAT_THROTTLE_MS`];
//!   play/pause/seek transitions always go out immediately.
//! - A settle window after any seek suppresses re-broadcast of locally
//!   observed changes, so a programmatic corrective seek is never misread as
//!   a user action and echoed back.

#[cfg(test)]
#[path = "playback_test.rs"]
mod playback_test;

use crate::consts::{HEARTBEAT_THROTTLE_MS, SEEK_SETTLE_MS, SEEK_THRESHOLD_SECS};
use crate::message::{OriginId, PlaybackUpdate, RoomEvent};

/// Lifecycle phase of the local media control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    /// No media control surface is attached yet.
    #[default]
    Idle,
    /// Surface attached, nothing played yet.
    Ready,
    /// Playback running.
    Playing,
    /// Playback paused.
    Paused,
}

/// The client's current view of shared playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Opaque identifier of the loaded media, if any.
    pub video_url: Option<String>,
    /// Whether playback is running.
    pub is_playing: bool,
    /// Playback position in seconds. Non-decreasing while playing, modulo
    /// explicit seeks.
    pub position_secs: f64,
    /// Client that last authored this state.
    pub origin: OriginId,
    /// Local clock in milliseconds when this state was last observed.
    pub observed_at_ms: i64,
}

/// Effect returned by [`PlaybackSync`] operations for the host to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    /// Broadcast this event to the room topic.
    Publish(RoomEvent),
    /// Seek the media control surface to the given position in seconds.
    Seek(f64),
    /// Set the media control surface play/pause state.
    SetPlaying(bool),
    /// Opportunistically write the playback row to the external store.
    PersistPlayback(PlaybackUpdate),
}

/// State machine reconciling local and remote playback state.
#[derive(Debug, Clone)]
pub struct PlaybackSync {
    origin: OriginId,
    state: PlaybackState,
    phase: PlayerPhase,
    /// Single in-flight seek target buffered while the surface is not ready.
    /// A newer seek overwrites an older unconsumed one.
    pending_seek: Option<f64>,
    /// Local clock until which locally observed changes are not re-broadcast.
    settle_until_ms: i64,
    /// Local clock of the last outgoing broadcast, for heartbeat throttling.
    last_broadcast_ms: Option<i64>,
    /// Outgoing propagation gate, enabled after late-joiner recovery.
    live: bool,
}

impl PlaybackSync {
    /// Create the machine with a default empty state, as on room entry.
    #[must_use]
    pub fn new(origin: OriginId) -> Self {
        Self {
            origin,
            state: PlaybackState {
                video_url: None,
                is_playing: false,
                position_secs: 0.0,
                origin,
                observed_at_ms: 0,
            },
            phase: PlayerPhase::Idle,
            pending_seek: None,
            settle_until_ms: 0,
            last_broadcast_ms: None,
            live: false,
        }
    }

    /// Current playback state.
    #[must_use]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Current surface lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    /// The buffered seek target, if the surface was not ready for one.
    #[must_use]
    pub fn pending_seek(&self) -> Option<f64> {
        self.pending_seek
    }

    /// Whether outgoing propagation is enabled.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Enable or disable outgoing propagation. Disabled until late-joiner
    /// recovery seeds this machine, so a joiner cannot overwrite the
    /// authoritative room state with a stale default.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    /// Record the media identifier for subsequent broadcasts.
    pub fn set_video_url(&mut self, video_url: Option<String>) {
        self.state.video_url = video_url;
    }

    /// The state as a wire payload.
    #[must_use]
    pub fn snapshot(&self) -> PlaybackUpdate {
        PlaybackUpdate {
            video_url: self.state.video_url.clone(),
            is_playing: self.state.is_playing,
            playback_time: self.state.position_secs,
        }
    }

    // --- Local operations (UI-level callbacks) ---

    /// The user started playback at `time`.
    pub fn apply_local_play(&mut self, time: f64, now_ms: i64) -> Vec<PlaybackEffect> {
        self.state.is_playing = true;
        self.state.position_secs = time;
        self.state.origin = self.origin;
        self.state.observed_at_ms = now_ms;
        if self.phase != PlayerPhase::Idle {
            self.phase = PlayerPhase::Playing;
        }
        self.broadcast_transition(now_ms)
    }

    /// The user paused playback at `time`.
    pub fn apply_local_pause(&mut self, time: f64, now_ms: i64) -> Vec<PlaybackEffect> {
        self.state.is_playing = false;
        self.state.position_secs = time;
        self.state.origin = self.origin;
        self.state.observed_at_ms = now_ms;
        if self.phase != PlayerPhase::Idle {
            self.phase = PlayerPhase::Paused;
        }
        self.broadcast_transition(now_ms)
    }

    /// The user (or the player, after a programmatic correction) seeked to
    /// `time`. Within the settle window the event is treated as the echo of
    /// a programmatic seek and is not re-broadcast.
    pub fn apply_local_seek(&mut self, time: f64, now_ms: i64) -> Vec<PlaybackEffect> {
        self.state.position_secs = time;
        self.state.origin = self.origin;
        self.state.observed_at_ms = now_ms;
        let effects = self.broadcast_transition(now_ms);
        self.settle_until_ms = now_ms + SEEK_SETTLE_MS;
        effects
    }

    /// Periodic position report from the player while media is loaded.
    /// Throttled: at most one outgoing broadcast per heartbeat window.
    pub fn on_time_update(&mut self, time: f64, now_ms: i64) -> Vec<PlaybackEffect> {
        self.state.position_secs = time;
        self.state.observed_at_ms = now_ms;
        if !self.live || self.settling(now_ms) {
            return Vec::new();
        }
        let due = self
            .last_broadcast_ms
            .is_none_or(|last| now_ms - last >= HEARTBEAT_THROTTLE_MS);
        if due {
            self.last_broadcast_ms = Some(now_ms);
            vec![PlaybackEffect::Publish(RoomEvent::PlaybackUpdate(self.snapshot()))]
        } else {
            Vec::new()
        }
    }

    // --- Remote operations ---

    /// Apply a peer's playback update.
    ///
    /// The play/pause flag is authoritative immediately; the time value is
    /// corrected only when drift exceeds the threshold. If the surface is
    /// not ready the corrective target is buffered into the pending seek.
    pub fn apply_remote_update(
        &mut self,
        origin: OriginId,
        update: &PlaybackUpdate,
        now_ms: i64,
    ) -> Vec<PlaybackEffect> {
        if origin == self.origin {
            return Vec::new();
        }
        self.reconcile(origin, update, now_ms)
    }

    /// A new participant asked for the current state; reply so it can seed
    /// without waiting for the next periodic update.
    #[must_use]
    pub fn respond_to_state_request(&self) -> Vec<PlaybackEffect> {
        vec![PlaybackEffect::Publish(RoomEvent::SendState(self.snapshot()))]
    }

    /// Seed from an authoritative row fetched during late-joiner recovery.
    /// Never publishes; the corrective seek still goes through the surface
    /// (or the pending-seek buffer if it is not attached yet).
    pub fn seed(&mut self, update: &PlaybackUpdate, now_ms: i64) -> Vec<PlaybackEffect> {
        self.reconcile(self.origin, update, now_ms)
    }

    // --- Surface lifecycle ---

    /// Attach the media control surface; consumes any buffered pending seek
    /// exactly once.
    pub fn on_surface_ready(&mut self, now_ms: i64) -> Vec<PlaybackEffect> {
        if self.phase == PlayerPhase::Idle {
            self.phase = if self.state.is_playing {
                PlayerPhase::Playing
            } else {
                PlayerPhase::Ready
            };
        }
        let mut effects = Vec::new();
        if let Some(target) = self.pending_seek.take() {
            self.state.position_secs = target;
            self.settle_until_ms = now_ms + SEEK_SETTLE_MS;
            effects.push(PlaybackEffect::Seek(target));
        }
        if self.state.is_playing {
            effects.push(PlaybackEffect::SetPlaying(true));
        }
        effects
    }

    // --- Internals ---

    fn surface_ready(&self) -> bool {
        self.phase != PlayerPhase::Idle
    }

    fn settling(&self, now_ms: i64) -> bool {
        now_ms < self.settle_until_ms
    }

    /// Emit a play/pause/seek broadcast. Never throttled, but suppressed
    /// while not live or inside the settle window.
    fn broadcast_transition(&mut self, now_ms: i64) -> Vec<PlaybackEffect> {
        if !self.live || self.settling(now_ms) {
            return Vec::new();
        }
        self.last_broadcast_ms = Some(now_ms);
        let snapshot = self.snapshot();
        vec![
            PlaybackEffect::Publish(RoomEvent::PlaybackUpdate(snapshot.clone())),
            PlaybackEffect::PersistPlayback(snapshot),
        ]
    }

    fn reconcile(
        &mut self,
        origin: OriginId,
        update: &PlaybackUpdate,
        now_ms: i64,
    ) -> Vec<PlaybackEffect> {
        let mut effects = Vec::new();

        if update.video_url.is_some() {
            self.state.video_url.clone_from(&update.video_url);
        }

        // Play/pause flag is applied unconditionally.
        self.state.is_playing = update.is_playing;
        if self.surface_ready() {
            self.phase = if update.is_playing {
                PlayerPhase::Playing
            } else {
                PlayerPhase::Paused
            };
        }
        effects.push(PlaybackEffect::SetPlaying(update.is_playing));

        // Time is corrected only past the drift threshold.
        let drift = (self.state.position_secs - update.playback_time).abs();
        if drift > SEEK_THRESHOLD_SECS {
            if self.surface_ready() {
                self.state.position_secs = update.playback_time;
                self.settle_until_ms = now_ms + SEEK_SETTLE_MS;
                effects.push(PlaybackEffect::Seek(update.playback_time));
            } else {
                self.pending_seek = Some(update.playback_time);
                self.state.position_secs = update.playback_time;
            }
        }

        self.state.origin = origin;
        self.state.observed_at_ms = now_ms;
        effects
    }
}
