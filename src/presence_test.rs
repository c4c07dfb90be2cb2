use super::*;

fn info(identity: &str, joined_at: i64) -> PresenceInfo {
    PresenceInfo {
        identity: identity.to_owned(),
        display_name: identity.to_uppercase(),
        joined_at,
    }
}

#[test]
fn announce_inserts_self_and_returns_join_event() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    let event = tracker.announce(1_000);

    let RoomEvent::PresenceJoin(payload) = event else {
        panic!("expected a presence-join event");
    };
    assert_eq!(payload.identity, "alice");
    assert_eq!(payload.display_name, "Alice");
    assert_eq!(payload.joined_at, 1_000);
    assert!(tracker.contains("alice"));
}

#[test]
fn join_is_new_only_once() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    assert!(tracker.apply_join(&info("bob", 2_000)));
    assert!(!tracker.apply_join(&info("bob", 3_000)));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn leave_removes_participant() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    tracker.apply_join(&info("bob", 2_000));
    tracker.apply_leave("bob");
    assert!(!tracker.contains("bob"));
    assert!(tracker.is_empty());
}

#[test]
fn leave_for_unknown_identity_is_noop() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    tracker.apply_leave("ghost");
    assert!(tracker.is_empty());
}

#[test]
fn participants_sorted_by_join_time_then_identity() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    tracker.apply_join(&info("carol", 3_000));
    tracker.apply_join(&info("bob", 1_000));
    tracker.apply_join(&info("dave", 1_000));

    let names: Vec<&str> = tracker
        .participants()
        .iter()
        .map(|p| p.identity.as_str())
        .collect();
    assert_eq!(names, vec!["bob", "dave", "carol"]);
}

#[test]
fn reannounce_keeps_original_join_time() {
    let mut tracker = PresenceTracker::new("alice", "Alice");
    tracker.announce(1_000);
    let RoomEvent::PresenceJoin(payload) = tracker.announce(9_000) else {
        panic!("expected a presence-join event");
    };
    assert_eq!(payload.joined_at, 1_000);
}

#[test]
fn depart_names_local_identity() {
    let tracker = PresenceTracker::new("alice", "Alice");
    assert_eq!(
        tracker.depart(),
        RoomEvent::PresenceLeave { identity: "alice".to_owned() }
    );
}
