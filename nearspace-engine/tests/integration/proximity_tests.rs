use nearspace_engine::SessionCommand;
use std::time::Duration;

use crate::integration::{
    init_tracing, participant, pid, place, spawn_node, update, wait_for_snapshot,
};

#[tokio::test]
async fn test_open_space_pair_within_radius_gets_session() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;

    let snapshot = wait_for_snapshot(&node.handle, 2000, |s| s.has_session(&pid("carol"))).await;

    assert!(snapshot.nearby.contains(&pid("carol")));
    assert!(snapshot.sessions[&pid("carol")].initiator);
    assert_eq!(snapshot.participants, 1);

    let offers = node.signaling.wait_for_offers(&pid("carol"), 1, 2000).await;
    assert_eq!(offers.len(), 1);
}

#[tokio::test]
async fn test_moving_out_of_range_disposes_session() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    let transports = node.factory.wait_for_transports(&pid("carol"), 1, 2000).await;

    node.handle
        .send(SessionCommand::ParticipantMoved {
            participant_id: pid("carol"),
            update: update(300.0, 100.0, None),
        })
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&node.handle, 2000, |s| !s.has_session(&pid("carol"))).await;
    assert!(snapshot.nearby.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transports[0].is_closed().await);
}

#[tokio::test]
async fn test_room_walls_separate_close_participants() {
    init_tracing();

    let node = spawn_node("bob", true);
    node.handle
        .local_moved(update(100.0, 100.0, Some("meeting-1")))
        .await
        .unwrap();
    node.handle
        .participants_snapshot(vec![
            participant("carol", 110.0, 100.0, Some("office-1")),
            participant("dave", 105.0, 100.0, None),
        ])
        .await
        .unwrap();

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(snapshot.nearby.is_empty());
    assert!(snapshot.sessions.is_empty());
    assert_eq!(node.factory.created().await, 0);
}

#[tokio::test]
async fn test_same_room_is_nearby_regardless_of_distance() {
    init_tracing();

    let node = spawn_node("bob", true);
    node.handle
        .local_moved(update(100.0, 100.0, Some("meeting-1")))
        .await
        .unwrap();
    node.handle
        .participants_snapshot(vec![participant("carol", 900.0, 700.0, Some("meeting-1"))])
        .await
        .unwrap();

    let snapshot = wait_for_snapshot(&node.handle, 2000, |s| s.has_session(&pid("carol"))).await;
    assert!(snapshot.nearby.contains(&pid("carol")));
}

#[tokio::test]
async fn test_higher_id_waits_for_offer() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("alice", 150.0, 100.0, None)]).await;

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(snapshot.nearby.contains(&pid("alice")));
    assert!(!snapshot.has_session(&pid("alice")));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.factory.created().await, 0);
    assert!(node.signaling.all().await.is_empty());
}

#[tokio::test]
async fn test_participant_left_disposes_session_and_stream() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    let transport = node.factory.wait_for_transports(&pid("carol"), 1, 2000).await[0].clone();

    transport
        .emit_remote_track("audio-carol", nearspace_engine::TrackKind::Audio)
        .await;
    let snapshot = wait_for_snapshot(&node.handle, 2000, |s| {
        s.sessions
            .get(&pid("carol"))
            .is_some_and(|session| session.has_remote_stream)
    })
    .await;
    assert!(snapshot.has_session(&pid("carol")));
    assert!(node.remote_streams.contains(&pid("carol")));

    node.handle
        .send(SessionCommand::ParticipantLeft(pid("carol")))
        .await
        .unwrap();

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(!snapshot.has_session(&pid("carol")));
    assert_eq!(snapshot.participants, 0);
    assert!(node.remote_streams.is_empty());
}
