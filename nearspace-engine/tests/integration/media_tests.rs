use nearspace_engine::{InboundSignal, LocalTrack, LocalTrackSet, MediaSource};
use std::time::Duration;

use crate::integration::{
    TestNode, init_tracing, participant, pid, place, spawn_node, wait_for_snapshot,
};
use crate::utils::{TransportCall, wait_for_call};

fn publish_camera(node: &TestNode, generation: u64) {
    let mic = LocalTrack::for_source(MediaSource::Microphone, node.id.as_str());
    let camera = LocalTrack::for_source(MediaSource::Camera, node.id.as_str());
    node.tracks
        .send_replace(LocalTrackSet::new(Some(mic), Some(camera), generation));
}

#[tokio::test]
async fn test_media_change_replaces_tracks_and_renegotiates() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    node.signaling.wait_for_offers(&pid("carol"), 1, 2000).await;
    let transport = node.factory.latest_for(&pid("carol")).await.unwrap();

    node.handle
        .signal(InboundSignal::answer("carol", "answer-1"))
        .await
        .unwrap();
    wait_for_call(&transport, 1, 2000, |c| matches!(c, TransportCall::ApplyAnswer(_))).await;

    publish_camera(&node, 1);

    wait_for_call(&transport, 1, 2000, |c| c == &TransportCall::ReplaceTracks(1)).await;
    node.signaling.wait_for_offers(&pid("carol"), 2, 2000).await;

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(snapshot.sessions[&pid("carol")].local_media_attached);
    assert_eq!(node.factory.created().await, 1);
}

#[tokio::test]
async fn test_media_change_during_first_exchange_is_queued() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    node.signaling.wait_for_offers(&pid("carol"), 1, 2000).await;
    let transport = node.factory.latest_for(&pid("carol")).await.unwrap();

    publish_camera(&node, 1);
    wait_for_call(&transport, 1, 2000, |c| c == &TransportCall::ReplaceTracks(1)).await;
    node.handle.snapshot().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.signaling.offers_to(&pid("carol")).await.len(), 1);

    node.handle
        .signal(InboundSignal::answer("carol", "answer-1"))
        .await
        .unwrap();

    node.signaling.wait_for_offers(&pid("carol"), 2, 2000).await;
    assert_eq!(
        transport
            .count(|c| c == &TransportCall::CreateOffer)
            .await,
        2
    );
}

#[tokio::test]
async fn test_new_sessions_start_with_current_tracks() {
    init_tracing();

    let node = spawn_node("bob", true);
    publish_camera(&node, 4);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;

    let snapshot = wait_for_snapshot(&node.handle, 2000, |s| s.has_session(&pid("carol"))).await;
    assert!(snapshot.sessions[&pid("carol")].local_media_attached);

    node.signaling.wait_for_offers(&pid("carol"), 1, 2000).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let transport = node.factory.latest_for(&pid("carol")).await.unwrap();
    assert_eq!(
        transport
            .count(|c| matches!(c, TransportCall::ReplaceTracks(_)))
            .await,
        0
    );
}
