//! Tokio driver — wires a [`RoomSession`] to a topic, a store, and the UI.
//!
//! LIFECYCLE
//! =========
//! 1. Subscribe to the room topic before anything else, so no reply sent
//!    during setup is missed.
//! 2. `connect` → announce presence + request state, while the store
//!    snapshot fetch runs concurrently.
//! 3. Event loop: inbound envelopes, UI commands, the batch-flush interval,
//!    and the snapshot arrival all funnel through the session reducer; the
//!    driver applies the resulting outputs.
//! 4. Dropping the [`SessionHandle`] (or calling `close`) ends the loop,
//!    broadcasts the leave announcement, and releases the subscription —
//!    nothing keeps mutating a torn-down session.
//!
//! All state mutation happens on this single task; store writes are spawned
//! fire-and-forget and only ever log on failure.

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::consts::BATCH_FLUSH_MS;
use crate::message::Envelope;
use crate::recovery::Snapshot;
use crate::session::{
    RoomSession, SessionConfig, SessionInput, SessionOutput, UiCallback, UiCommand,
};
use crate::store::StoreClient;
use crate::transport::{Topic, Transport};

/// Milliseconds since the Unix epoch on the local clock.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Handle to a running session task.
///
/// Dropping the handle tears the session down; [`SessionHandle::close`]
/// does the same but waits for the teardown to finish.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<UiCommand>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Send a UI command to the session. Returns `false` if the session
    /// task has already ended.
    pub fn command(&self, command: UiCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Leave the room and wait for teardown to complete.
    pub async fn close(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            warn!(error = %e, "session task ended abnormally");
        }
    }
}

/// Spawn a session for `config` on the given topic.
///
/// Returns the command handle and the stream of UI callbacks (seeks,
/// play/pause, paint ops) for the rendering layer to consume. With no
/// store, recovery seeds from an empty snapshot and relies on peer
/// `send-state` replies alone.
#[must_use]
pub fn spawn_session(
    config: SessionConfig,
    topic: Topic,
    store: Option<StoreClient>,
) -> (SessionHandle, mpsc::UnboundedReceiver<UiCallback>) {
    // Subscribe before the task starts so nothing sent during setup is lost.
    let inbound = topic.subscribe();
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (callback_tx, callback_rx) = mpsc::unbounded_channel();
    let session = RoomSession::new(config);
    let task = tokio::spawn(run(session, topic, store, inbound, command_rx, callback_tx));
    (SessionHandle { commands: command_tx, task }, callback_rx)
}

async fn run(
    mut session: RoomSession,
    topic: Topic,
    store: Option<StoreClient>,
    mut inbound: broadcast::Receiver<Envelope>,
    mut commands: mpsc::UnboundedReceiver<UiCommand>,
    callbacks: mpsc::UnboundedSender<UiCallback>,
) {
    let room = session.room().to_owned();
    info!(room = %room, origin = %session.origin(), "session connecting");

    // The snapshot fetch runs concurrently with inbound traffic; the
    // subscription buffers whatever arrives meanwhile.
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<Snapshot>(1);
    {
        let store = store.clone();
        let room = room.clone();
        tokio::spawn(async move {
            let snapshot = match store {
                Some(store) => store.fetch_snapshot(&room).await,
                None => Snapshot::default(),
            };
            let _ = snapshot_tx.send(snapshot).await;
        });
    }

    let mut ctx = Applier { topic, store, callbacks, room, flush_active: false };
    let outputs = session.connect(now_ms());
    ctx.apply(outputs);

    let mut flush = time::interval(Duration::from_millis(BATCH_FLUSH_MS));
    flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            Some(snapshot) = snapshot_rx.recv() => {
                let outputs = session.handle(SessionInput::SnapshotLoaded(snapshot), now_ms());
                ctx.apply(outputs);
            }
            received = inbound.recv() => match received {
                Ok(envelope) => {
                    let outputs = session.handle(SessionInput::Inbound(envelope), now_ms());
                    ctx.apply(outputs);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(room = %ctx.room, skipped, "transport subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            command = commands.recv() => match command {
                Some(command) => {
                    let outputs = session.handle(SessionInput::Ui(command), now_ms());
                    ctx.apply(outputs);
                }
                // Handle dropped: leave the room.
                None => break,
            },
            _ = flush.tick(), if ctx.flush_active => {
                let outputs = session.handle(SessionInput::FlushTick, now_ms());
                ctx.apply(outputs);
            }
        }
    }

    ctx.apply(session.leave());
    info!(room = %ctx.room, "session closed");
    // `inbound` drops here, releasing the topic subscription.
}

/// Applies reducer outputs: publishes, UI callbacks, timer state, and
/// fire-and-forget store writes.
struct Applier {
    topic: Topic,
    store: Option<StoreClient>,
    callbacks: mpsc::UnboundedSender<UiCallback>,
    room: String,
    flush_active: bool,
}

impl Applier {
    fn apply(&mut self, outputs: Vec<SessionOutput>) {
        for output in outputs {
            match output {
                SessionOutput::Publish(envelope) => self.topic.publish(envelope),
                SessionOutput::Ui(callback) => {
                    // The UI having gone away is not the session's problem.
                    let _ = self.callbacks.send(callback);
                }
                SessionOutput::StartFlushTimer => self.flush_active = true,
                SessionOutput::StopFlushTimer => self.flush_active = false,
                SessionOutput::PersistStroke(batch) => {
                    let Some(store) = self.store.clone() else { continue };
                    let room = self.room.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store.append_stroke(&room, batch).await {
                            warn!(room = %room, error = %e, "stroke persist failed");
                        }
                    });
                }
                SessionOutput::PersistPlayback(update) => {
                    let Some(store) = self.store.clone() else { continue };
                    let room = self.room.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store.update_playback(&room, &update).await {
                            warn!(room = %room, error = %e, "playback persist failed");
                        }
                    });
                }
                SessionOutput::ClearStrokes => {
                    let Some(store) = self.store.clone() else { continue };
                    let room = self.room.clone();
                    tokio::spawn(async move {
                        if let Err(e) = store.clear_strokes(&room).await {
                            warn!(room = %room, error = %e, "stroke clear failed");
                        }
                    });
                }
            }
        }
    }
}
