#![allow(clippy::float_cmp)]

use super::*;
use crate::consts::SEEK_THRESHOLD_SECS;
use crate::message::{StrokePoint, Tool};

fn config(identity: &str) -> SessionConfig {
    SessionConfig {
        room: "movie-night".to_owned(),
        identity: identity.to_owned(),
        display_name: identity.to_uppercase(),
        video_url: Some("yt:abc123".to_owned()),
    }
}

fn pen() -> StrokeStyle {
    StrokeStyle { color: "#1a1a1a".to_owned(), tool: Tool::Pen, size: 3.0 }
}

/// A session that connected and finished recovery with an empty snapshot.
fn live_session(identity: &str) -> RoomSession {
    let mut session = RoomSession::new(config(identity));
    session.handle(SessionInput::Ui(UiCommand::SurfaceReady), 0);
    session.connect(0);
    session.handle(SessionInput::SnapshotLoaded(Snapshot::default()), 0);
    session
}

fn publishes(outputs: &[SessionOutput]) -> Vec<Envelope> {
    outputs
        .iter()
        .filter_map(|o| match o {
            SessionOutput::Publish(env) => Some(env.clone()),
            _ => None,
        })
        .collect()
}

fn ui_callbacks(outputs: &[SessionOutput]) -> Vec<UiCallback> {
    outputs
        .iter()
        .filter_map(|o| match o {
            SessionOutput::Ui(cb) => Some(cb.clone()),
            _ => None,
        })
        .collect()
}

/// Relay every published envelope from one session's outputs into another.
fn relay(outputs: &[SessionOutput], to: &mut RoomSession, now_ms: i64) -> Vec<SessionOutput> {
    let mut results = Vec::new();
    for env in publishes(outputs) {
        results.extend(to.handle(SessionInput::Inbound(env), now_ms));
    }
    results
}

// =============================================================
// Connect sequence
// =============================================================

#[test]
fn connect_announces_then_requests_state() {
    let mut session = RoomSession::new(config("alice"));
    let outputs = session.connect(1_000);

    let events = publishes(&outputs);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].event, RoomEvent::PresenceJoin(_)));
    assert_eq!(events[1].event, RoomEvent::RequestState);
    assert!(!session.is_live());
    // Every outgoing envelope carries our origin.
    assert!(events.iter().all(|e| e.origin == session.origin()));
}

#[test]
fn ui_events_before_seeding_are_not_broadcast() {
    let mut session = RoomSession::new(config("alice"));
    session.handle(SessionInput::Ui(UiCommand::SurfaceReady), 0);
    session.connect(0);

    let outputs = session.handle(SessionInput::Ui(UiCommand::Play { time: 0.0 }), 100);
    assert!(publishes(&outputs).is_empty());

    let mut outputs = session.handle(
        SessionInput::Ui(UiCommand::PointerDown { x: 1.0, y: 1.0, style: pen() }),
        200,
    );
    outputs.extend(session.handle(SessionInput::Ui(UiCommand::PointerUp), 300));
    assert!(publishes(&outputs).is_empty());
}

#[test]
fn snapshot_seeds_playback_and_strokes_then_goes_live() {
    let mut session = RoomSession::new(config("joiner"));
    session.handle(SessionInput::Ui(UiCommand::SurfaceReady), 0);
    session.connect(0);

    let strokes = vec![
        StrokeBatch {
            points: vec![StrokePoint::start(0.0, 0.0), StrokePoint::move_to(1.0, 1.0)],
            style: pen(),
            origin: uuid::Uuid::new_v4(),
        };
        4
    ];
    let snapshot = Snapshot {
        strokes,
        playback: Some(PlaybackUpdate {
            video_url: Some("yt:abc123".to_owned()),
            is_playing: true,
            playback_time: 42.0,
        }),
    };
    let outputs = session.handle(SessionInput::SnapshotLoaded(snapshot), 1_000);

    assert!(session.is_live());
    assert_eq!(session.drawing().log().len(), 4);
    assert!((session.playback().state().position_secs - 42.0).abs() <= SEEK_THRESHOLD_SECS);
    // Seeding never broadcasts.
    assert!(publishes(&outputs).is_empty());
    // The player is told to catch up.
    let callbacks = ui_callbacks(&outputs);
    assert!(callbacks.contains(&UiCallback::SetPlaying(true)));
    assert!(callbacks.contains(&UiCallback::Seek(42.0)));
}

// =============================================================
// Two clients exchanging events
// =============================================================

#[test]
fn stroke_propagates_to_peer_log_and_surface() {
    let mut alice = live_session("alice");
    let mut bob = live_session("bob");

    let mut outputs = alice.handle(
        SessionInput::Ui(UiCommand::PointerDown { x: 10.0, y: 10.0, style: pen() }),
        1_000,
    );
    outputs.extend(alice.handle(SessionInput::Ui(UiCommand::PointerMove { x: 20.0, y: 20.0 }), 1_005));
    outputs.extend(alice.handle(SessionInput::Ui(UiCommand::PointerUp), 1_010));

    let bob_outputs = relay(&outputs, &mut bob, 1_020);

    assert_eq!(bob.drawing().log().len(), 1);
    assert_eq!(bob.drawing().log(), alice.drawing().log());
    assert!(ui_callbacks(&bob_outputs)
        .iter()
        .any(|cb| matches!(cb, UiCallback::Paint(_))));
}

#[test]
fn play_propagates_as_set_playing_on_peer() {
    let mut alice = live_session("alice");
    let mut bob = live_session("bob");

    let outputs = alice.handle(SessionInput::Ui(UiCommand::Play { time: 5.0 }), 1_000);
    let bob_outputs = relay(&outputs, &mut bob, 1_050);

    assert!(ui_callbacks(&bob_outputs).contains(&UiCallback::SetPlaying(true)));
    assert!(bob.playback().state().is_playing);
}

#[test]
fn own_echo_produces_no_outputs() {
    let mut alice = live_session("alice");
    let outputs = alice.handle(SessionInput::Ui(UiCommand::Play { time: 5.0 }), 1_000);
    let before_log = alice.drawing().log().len();
    let before_state = alice.playback().state().clone();

    for env in publishes(&outputs) {
        let echoed = alice.handle(SessionInput::Inbound(env), 1_100);
        assert!(echoed.is_empty());
    }
    assert_eq!(alice.drawing().log().len(), before_log);
    assert_eq!(*alice.playback().state(), before_state);
}

#[test]
fn live_peer_answers_state_request() {
    let mut veteran = live_session("veteran");
    veteran.handle(SessionInput::Ui(UiCommand::Play { time: 33.0 }), 1_000);

    let mut joiner = RoomSession::new(config("joiner"));
    let join_outputs = joiner.connect(2_000);

    let replies = relay(&join_outputs, &mut veteran, 2_010);
    let reply_events: Vec<RoomEvent> = publishes(&replies).into_iter().map(|e| e.event).collect();
    assert!(reply_events.iter().any(|e| matches!(
        e,
        RoomEvent::SendState(update) if update.playback_time == 33.0 && update.is_playing
    )));
}

#[test]
fn seeding_peer_does_not_answer_state_request() {
    let mut seeding = RoomSession::new(config("seeding"));
    seeding.connect(0);

    let request = Envelope { origin: uuid::Uuid::new_v4(), event: RoomEvent::RequestState };
    let outputs = seeding.handle(SessionInput::Inbound(request), 100);
    assert!(publishes(&outputs).is_empty());
}

#[test]
fn batch_received_during_seeding_survives_the_snapshot() {
    let mut joiner = RoomSession::new(config("joiner"));
    joiner.handle(SessionInput::Ui(UiCommand::SurfaceReady), 0);
    joiner.connect(0);

    // A peer keeps drawing while our store fetch is in flight.
    let live = StrokeBatch {
        points: vec![StrokePoint::start(5.0, 5.0), StrokePoint::move_to(6.0, 6.0)],
        style: pen(),
        origin: uuid::Uuid::new_v4(),
    };
    joiner.handle(
        SessionInput::Inbound(Envelope {
            origin: live.origin,
            event: RoomEvent::DrawBatch(live.clone()),
        }),
        100,
    );
    assert_eq!(joiner.drawing().log().len(), 1);

    let history = StrokeBatch {
        points: vec![StrokePoint::start(0.0, 0.0), StrokePoint::move_to(1.0, 1.0)],
        style: pen(),
        origin: uuid::Uuid::new_v4(),
    };
    joiner.handle(
        SessionInput::SnapshotLoaded(Snapshot { strokes: vec![history.clone()], playback: None }),
        200,
    );

    // The fetched history lands first; the in-flight batch is not lost.
    assert!(joiner.is_live());
    assert_eq!(joiner.drawing().log(), &[history, live]);
}

#[test]
fn peer_send_state_seeds_joiner_before_snapshot() {
    let mut joiner = RoomSession::new(config("joiner"));
    joiner.handle(SessionInput::Ui(UiCommand::SurfaceReady), 0);
    joiner.connect(0);

    let reply = Envelope {
        origin: uuid::Uuid::new_v4(),
        event: RoomEvent::SendState(PlaybackUpdate {
            video_url: None,
            is_playing: true,
            playback_time: 42.0,
        }),
    };
    let outputs = joiner.handle(SessionInput::Inbound(reply), 500);
    assert!(ui_callbacks(&outputs).contains(&UiCallback::Seek(42.0)));
    // Still waiting on the store snapshot before going live.
    assert!(!joiner.is_live());
}

// =============================================================
// Presence
// =============================================================

#[test]
fn newcomer_join_is_greeted_exactly_once() {
    let mut veteran = live_session("veteran");

    let join = Envelope {
        origin: uuid::Uuid::new_v4(),
        event: RoomEvent::PresenceJoin(crate::message::PresenceInfo {
            identity: "newbie".to_owned(),
            display_name: "Newbie".to_owned(),
            joined_at: 5_000,
        }),
    };
    let outputs = veteran.handle(SessionInput::Inbound(join.clone()), 5_010);
    assert_eq!(publishes(&outputs).len(), 1);
    assert!(matches!(publishes(&outputs)[0].event, RoomEvent::PresenceJoin(_)));
    assert!(veteran.presence().contains("newbie"));

    // The repeated announcement is not greeted again.
    let outputs = veteran.handle(SessionInput::Inbound(join), 5_020);
    assert!(publishes(&outputs).is_empty());
}

#[test]
fn leave_removes_from_roster() {
    let mut veteran = live_session("veteran");
    veteran.handle(
        SessionInput::Inbound(Envelope {
            origin: uuid::Uuid::new_v4(),
            event: RoomEvent::PresenceJoin(crate::message::PresenceInfo {
                identity: "newbie".to_owned(),
                display_name: "Newbie".to_owned(),
                joined_at: 5_000,
            }),
        }),
        5_010,
    );
    veteran.handle(
        SessionInput::Inbound(Envelope {
            origin: uuid::Uuid::new_v4(),
            event: RoomEvent::PresenceLeave { identity: "newbie".to_owned() },
        }),
        6_000,
    );
    assert!(!veteran.presence().contains("newbie"));
}

// =============================================================
// Clear and resize
// =============================================================

#[test]
fn clear_round_trip_between_clients() {
    let mut alice = live_session("alice");
    let mut bob = live_session("bob");

    let mut outputs = bob.handle(
        SessionInput::Ui(UiCommand::PointerDown { x: 1.0, y: 1.0, style: pen() }),
        1_000,
    );
    outputs.extend(bob.handle(SessionInput::Ui(UiCommand::PointerUp), 1_010));
    relay(&outputs, &mut alice, 1_020);
    assert_eq!(alice.drawing().log().len(), 1);

    let outputs = alice.handle(SessionInput::Ui(UiCommand::ClearCanvas), 2_000);
    assert!(outputs.contains(&SessionOutput::ClearStrokes));
    relay(&outputs, &mut bob, 2_010);
    assert!(bob.drawing().log().is_empty());
    assert!(alice.drawing().log().is_empty());
}

#[test]
fn resize_replays_the_whole_log() {
    let mut session = live_session("alice");
    let mut outputs = session.handle(
        SessionInput::Ui(UiCommand::PointerDown { x: 1.0, y: 1.0, style: pen() }),
        1_000,
    );
    outputs.extend(session.handle(SessionInput::Ui(UiCommand::PointerUp), 1_010));

    let replayed = session.handle(SessionInput::Ui(UiCommand::Resize), 2_000);
    let paints = ui_callbacks(&replayed);
    assert_eq!(paints.first(), Some(&UiCallback::Paint(crate::drawing::PaintOp::Clear)));
    assert!(paints.len() > 1);
}

// =============================================================
// Timers
// =============================================================

#[test]
fn flush_timer_started_and_stopped_around_stroke() {
    let mut session = live_session("alice");
    let outputs = session.handle(
        SessionInput::Ui(UiCommand::PointerDown { x: 1.0, y: 1.0, style: pen() }),
        1_000,
    );
    assert!(outputs.contains(&SessionOutput::StartFlushTimer));

    let outputs = session.handle(SessionInput::Ui(UiCommand::PointerUp), 1_010);
    assert!(outputs.contains(&SessionOutput::StopFlushTimer));
}

#[test]
fn flush_tick_between_strokes_is_silent() {
    let mut session = live_session("alice");
    assert!(session.handle(SessionInput::FlushTick, 1_000).is_empty());
}
