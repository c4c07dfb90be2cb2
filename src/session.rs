//! Room session — composition of the synchronization state machines.
//!
//! ARCHITECTURE
//! ============
//! [`RoomSession`] is the single reducer the driver talks to: every UI
//! command, inbound envelope, timer tick, and snapshot arrival enters
//! through [`RoomSession::handle`], which routes to the owning machine and
//! converts its effects into [`SessionOutput`] values. The session never
//! performs I/O and never invokes UI code from inside a mutation — outputs
//! are applied by the driver after the reducer returns.
//!
//! Echo suppression happens here: inbound envelopes pass through the
//! [`EchoFilter`] before any machine sees them, and every outgoing event is
//! tagged with the session's origin id.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use uuid::Uuid;

use crate::drawing::{DrawEffect, DrawingSync, PaintOp};
use crate::message::{Envelope, OriginId, PlaybackUpdate, RoomEvent, StrokeBatch, StrokeStyle};
use crate::playback::{PlaybackEffect, PlaybackSync};
use crate::presence::PresenceTracker;
use crate::recovery::{RecoveryCoordinator, Snapshot};
use crate::transport::EchoFilter;

/// Static identity of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Room (topic) name.
    pub room: String,
    /// Stable identity of the local participant.
    pub identity: String,
    /// Name shown in the roster.
    pub display_name: String,
    /// Media identifier to load initially, if known.
    pub video_url: Option<String>,
}

/// A UI-level event entering the session.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// The user started playback at `time` seconds.
    Play { time: f64 },
    /// The user paused playback at `time` seconds.
    Pause { time: f64 },
    /// The user (or the player after a correction) seeked to `time`.
    Seek { time: f64 },
    /// Periodic position report from the player.
    TimeUpdate { time: f64 },
    /// The media control surface became ready.
    SurfaceReady,
    /// Pointer pressed on the drawing surface.
    PointerDown { x: f64, y: f64, style: StrokeStyle },
    /// Pointer moved while pressed.
    PointerMove { x: f64, y: f64 },
    /// Pointer released.
    PointerUp,
    /// The user cleared the drawing.
    ClearCanvas,
    /// The drawing surface was resized; its backing bitmap was reset.
    Resize,
}

/// Everything the session can ask of the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// A UI command from the embedding application.
    Ui(UiCommand),
    /// An envelope received from the room topic.
    Inbound(Envelope),
    /// The batch-flush interval fired.
    FlushTick,
    /// The store snapshot fetch resolved.
    SnapshotLoaded(Snapshot),
}

/// Callback surfaced to the rendering/player layer.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCallback {
    /// Seek the media control surface to the given position.
    Seek(f64),
    /// Set the media control surface play/pause state.
    SetPlaying(bool),
    /// Apply one paint operation to the drawing surface.
    Paint(PaintOp),
}

/// Effect the driver must apply after a reducer step.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    /// Publish this envelope on the room topic.
    Publish(Envelope),
    /// Fire-and-forget append of a batch to the external store.
    PersistStroke(StrokeBatch),
    /// Fire-and-forget update of the room's playback row.
    PersistPlayback(PlaybackUpdate),
    /// Fire-and-forget delete of the room's stroke history.
    ClearStrokes,
    /// Deliver a callback to the UI layer.
    Ui(UiCallback),
    /// Start the fixed-interval batch-flush timer.
    StartFlushTimer,
    /// Stop the batch-flush timer.
    StopFlushTimer,
}

/// One client's view of a shared room, as a pure reducer.
#[derive(Debug, Clone)]
pub struct RoomSession {
    config: SessionConfig,
    filter: EchoFilter,
    playback: PlaybackSync,
    drawing: DrawingSync,
    presence: PresenceTracker,
    recovery: RecoveryCoordinator,
}

impl RoomSession {
    /// Create a session with a fresh random origin id.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let origin: OriginId = Uuid::new_v4();
        let mut playback = PlaybackSync::new(origin);
        playback.set_video_url(config.video_url.clone());
        Self {
            filter: EchoFilter::new(origin),
            playback,
            drawing: DrawingSync::new(origin),
            presence: PresenceTracker::new(config.identity.clone(), config.display_name.clone()),
            recovery: RecoveryCoordinator::new(),
            config,
        }
    }

    /// The session's origin id.
    #[must_use]
    pub fn origin(&self) -> OriginId {
        self.filter.origin()
    }

    /// The room name this session belongs to.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.config.room
    }

    /// Whether late-joiner recovery finished.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.recovery.is_live()
    }

    /// Playback machine, for state inspection.
    #[must_use]
    pub fn playback(&self) -> &PlaybackSync {
        &self.playback
    }

    /// Drawing engine, for state inspection.
    #[must_use]
    pub fn drawing(&self) -> &DrawingSync {
        &self.drawing
    }

    /// Presence roster.
    #[must_use]
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Begin the connect sequence. Call only after the topic subscription
    /// is open: announces presence and requests current state from peers.
    pub fn connect(&mut self, now_ms: i64) -> Vec<SessionOutput> {
        let announce = self.presence.announce(now_ms);
        let request = self.recovery.begin();
        vec![
            SessionOutput::Publish(self.filter.tag(announce)),
            SessionOutput::Publish(self.filter.tag(request)),
        ]
    }

    /// Produce the leave announcement for teardown.
    #[must_use]
    pub fn leave(&self) -> Vec<SessionOutput> {
        vec![SessionOutput::Publish(self.filter.tag(self.presence.depart()))]
    }

    /// Apply one input and return the outputs the driver must act on.
    pub fn handle(&mut self, input: SessionInput, now_ms: i64) -> Vec<SessionOutput> {
        match input {
            SessionInput::Ui(command) => self.handle_ui(command, now_ms),
            SessionInput::Inbound(envelope) => self.handle_inbound(envelope, now_ms),
            SessionInput::FlushTick => {
                let fx = self.drawing.flush_tick();
                self.drawing_outputs(fx)
            }
            SessionInput::SnapshotLoaded(snapshot) => {
                let seeded = self.recovery.complete(
                    snapshot,
                    &mut self.playback,
                    &mut self.drawing,
                    now_ms,
                );
                let mut outputs: Vec<SessionOutput> = seeded
                    .paint
                    .into_iter()
                    .map(|op| SessionOutput::Ui(UiCallback::Paint(op)))
                    .collect();
                outputs.extend(self.playback_outputs(seeded.playback));
                outputs
            }
        }
    }

    fn handle_ui(&mut self, command: UiCommand, now_ms: i64) -> Vec<SessionOutput> {
        match command {
            UiCommand::Play { time } => {
                let fx = self.playback.apply_local_play(time, now_ms);
                self.playback_outputs(fx)
            }
            UiCommand::Pause { time } => {
                let fx = self.playback.apply_local_pause(time, now_ms);
                self.playback_outputs(fx)
            }
            UiCommand::Seek { time } => {
                let fx = self.playback.apply_local_seek(time, now_ms);
                self.playback_outputs(fx)
            }
            UiCommand::TimeUpdate { time } => {
                let fx = self.playback.on_time_update(time, now_ms);
                self.playback_outputs(fx)
            }
            UiCommand::SurfaceReady => {
                let fx = self.playback.on_surface_ready(now_ms);
                self.playback_outputs(fx)
            }
            UiCommand::PointerDown { x, y, style } => {
                let fx = self.drawing.pointer_down(x, y, style);
                self.drawing_outputs(fx)
            }
            UiCommand::PointerMove { x, y } => {
                let fx = self.drawing.pointer_move(x, y);
                self.drawing_outputs(fx)
            }
            UiCommand::PointerUp => {
                let fx = self.drawing.pointer_up();
                self.drawing_outputs(fx)
            }
            UiCommand::ClearCanvas => {
                let fx = self.drawing.clear_all();
                self.drawing_outputs(fx)
            }
            UiCommand::Resize => self
                .drawing
                .repaint_all()
                .into_iter()
                .map(|op| SessionOutput::Ui(UiCallback::Paint(op)))
                .collect(),
        }
    }

    fn handle_inbound(&mut self, envelope: Envelope, now_ms: i64) -> Vec<SessionOutput> {
        let Some((origin, event)) = self.filter.admit(envelope) else {
            return Vec::new();
        };
        match event {
            RoomEvent::PlaybackUpdate(update) => {
                let fx = self.playback.apply_remote_update(origin, &update, now_ms);
                self.playback_outputs(fx)
            }
            RoomEvent::RequestState => {
                // Only a seeded client holds state worth answering with.
                if self.recovery.is_live() {
                    let fx = self.playback.respond_to_state_request();
                    self.playback_outputs(fx)
                } else {
                    Vec::new()
                }
            }
            RoomEvent::SendState(update) => {
                if self.recovery.is_live() {
                    let fx = self.playback.apply_remote_update(origin, &update, now_ms);
                    self.playback_outputs(fx)
                } else {
                    let fx =
                        self.recovery
                            .apply_send_state(&mut self.playback, &update, now_ms);
                    self.playback_outputs(fx)
                }
            }
            RoomEvent::Draw(live) => {
                let fx = self.drawing.apply_remote_point(origin, &live);
                self.drawing_outputs(fx)
            }
            RoomEvent::DrawBatch(batch) => {
                let fx = self.drawing.apply_remote_batch(origin, batch);
                self.drawing_outputs(fx)
            }
            RoomEvent::Clear => {
                let fx = self.drawing.apply_remote_clear(origin);
                self.drawing_outputs(fx)
            }
            RoomEvent::PresenceJoin(info) => {
                let newcomer = self.presence.apply_join(&info);
                // Greet a newcomer once so its roster learns about us.
                if newcomer && self.recovery.is_live() {
                    let announce = self.presence.announce(now_ms);
                    vec![SessionOutput::Publish(self.filter.tag(announce))]
                } else {
                    Vec::new()
                }
            }
            RoomEvent::PresenceLeave { identity } => {
                self.presence.apply_leave(&identity);
                Vec::new()
            }
        }
    }

    fn playback_outputs(&self, effects: Vec<PlaybackEffect>) -> Vec<SessionOutput> {
        effects
            .into_iter()
            .map(|effect| match effect {
                PlaybackEffect::Publish(event) => SessionOutput::Publish(self.filter.tag(event)),
                PlaybackEffect::Seek(time) => SessionOutput::Ui(UiCallback::Seek(time)),
                PlaybackEffect::SetPlaying(playing) => {
                    SessionOutput::Ui(UiCallback::SetPlaying(playing))
                }
                PlaybackEffect::PersistPlayback(update) => SessionOutput::PersistPlayback(update),
            })
            .collect()
    }

    fn drawing_outputs(&self, effects: Vec<DrawEffect>) -> Vec<SessionOutput> {
        effects
            .into_iter()
            .map(|effect| match effect {
                DrawEffect::Paint(op) => SessionOutput::Ui(UiCallback::Paint(op)),
                DrawEffect::Publish(event) => SessionOutput::Publish(self.filter.tag(event)),
                DrawEffect::Persist(batch) => SessionOutput::PersistStroke(batch),
                DrawEffect::ClearStore => SessionOutput::ClearStrokes,
                DrawEffect::StartFlushTimer => SessionOutput::StartFlushTimer,
                DrawEffect::StopFlushTimer => SessionOutput::StopFlushTimer,
            })
            .collect()
    }
}
