use uuid::Uuid;

use super::*;

fn clear_from(origin: OriginId) -> Envelope {
    Envelope { origin, event: RoomEvent::Clear }
}

// =============================================================
// TopicHub
// =============================================================

#[tokio::test]
async fn same_room_name_returns_same_channel() {
    let hub = TopicHub::new();
    let a = hub.topic("movie-night");
    let b = hub.topic("movie-night");

    let mut rx = b.subscribe();
    a.publish(clear_from(Uuid::new_v4()));
    let received = rx.recv().await.unwrap();
    assert_eq!(received.event, RoomEvent::Clear);
}

#[tokio::test]
async fn different_rooms_are_isolated() {
    let hub = TopicHub::new();
    let a = hub.topic("room-a");
    let b = hub.topic("room-b");

    let mut rx = b.subscribe();
    a.publish(clear_from(Uuid::new_v4()));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn every_subscriber_receives_each_publish() {
    let hub = TopicHub::new();
    let topic = hub.topic("room");
    let mut rx1 = topic.subscribe();
    let mut rx2 = topic.subscribe();

    let origin = Uuid::new_v4();
    topic.publish(clear_from(origin));

    assert_eq!(rx1.recv().await.unwrap().origin, origin);
    assert_eq!(rx2.recv().await.unwrap().origin, origin);
}

#[test]
fn publish_without_subscribers_is_not_an_error() {
    let hub = TopicHub::new();
    let topic = hub.topic("empty");
    topic.publish(clear_from(Uuid::new_v4()));
}

// =============================================================
// EchoFilter
// =============================================================

#[test]
fn filter_drops_own_echo() {
    let origin = Uuid::new_v4();
    let filter = EchoFilter::new(origin);
    let envelope = filter.tag(RoomEvent::Clear);
    assert_eq!(envelope.origin, origin);
    assert!(filter.admit(envelope).is_none());
}

#[test]
fn filter_admits_remote_envelopes() {
    let filter = EchoFilter::new(Uuid::new_v4());
    let remote = Uuid::new_v4();
    let (origin, event) = filter.admit(clear_from(remote)).unwrap();
    assert_eq!(origin, remote);
    assert_eq!(event, RoomEvent::Clear);
}
