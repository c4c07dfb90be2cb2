//! Real-time session synchronization core for shared watch-party rooms.
//!
//! Multiple participants in a room see the same media playback position and
//! the same freehand drawing surface in near real time, even though each
//! client runs its own clock and reaches the shared message relay with its
//! own latency. There is no central arbiter of truth at the protocol layer:
//! clients exchange broadcast envelopes on a room topic and reconcile
//! locally, with a drift threshold for playback and an append-only stroke
//! log for drawing. Rendering, auth, voice, and the persistence HTTP service
//! live outside this crate and are consumed through small interfaces.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`message`] | Wire envelope and room event types |
//! | [`transport`] | Topic pub/sub seam, in-process hub, echo suppression |
//! | [`playback`] | Playback reconciliation state machine |
//! | [`drawing`] | Stroke log, batching, replay, pen/eraser compositing |
//! | [`presence`] | Participant roster from presence events |
//! | [`recovery`] | Late-joiner seeding before outgoing propagation |
//! | [`store`] | REST client for the external persistence API |
//! | [`session`] | Composition reducer: inputs in, outputs out |
//! | [`driver`] | Tokio event loop wiring a session to topic/store/UI |
//! | [`consts`] | Thresholds, throttle windows, timer intervals |
//!
//! State machines are pure and synchronous; all I/O lives in [`driver`] and
//! [`store`]. A typical embedding creates a [`transport::TopicHub`] (or its
//! own [`transport::Transport`]), then calls [`driver::spawn_session`] and
//! feeds [`session::UiCommand`]s in while consuming
//! [`session::UiCallback`]s.

pub mod consts;
pub mod drawing;
pub mod driver;
pub mod error;
pub mod message;
pub mod playback;
pub mod presence;
pub mod recovery;
pub mod session;
pub mod store;
pub mod transport;

pub use error::SyncError;
