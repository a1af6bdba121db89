use nearspace_engine::{
    ConnectionWrapper, LocalTrack, LocalTrackSet, MediaSource, PeerTransport, SessionTag,
    TransportConfig,
};
use tokio::sync::mpsc;

use crate::integration::{init_tracing, pid};

fn local_only() -> TransportConfig {
    TransportConfig {
        ice_servers: vec![],
    }
}

#[tokio::test]
async fn test_webrtc_offer_answer_exchange() {
    init_tracing();

    let (alice_tx, _alice_rx) = mpsc::channel(256);
    let (bob_tx, _bob_rx) = mpsc::channel(256);

    let mic = LocalTrack::for_source(MediaSource::Microphone, "alice");
    let alice_tracks = LocalTrackSet::new(Some(mic), None, 1);

    let alice = ConnectionWrapper::new(
        SessionTag::new(pid("bob")),
        local_only(),
        &alice_tracks,
        alice_tx,
    )
    .await
    .expect("Failed to create alice's connection");

    let bob = ConnectionWrapper::new(
        SessionTag::new(pid("alice")),
        local_only(),
        &LocalTrackSet::default(),
        bob_tx,
    )
    .await
    .expect("Failed to create bob's connection");

    let offer = alice.create_offer().await.expect("Failed to create offer");
    assert!(offer.contains("m=audio"));
    assert!(offer.contains("m=video"), "receive-only video must be offered");

    let answer = bob.accept_offer(offer).await.expect("Failed to answer");

    assert!(alice.apply_answer(answer.clone()).await.unwrap());
    assert!(
        !alice.apply_answer(answer).await.unwrap(),
        "second answer must be ignored once stable"
    );

    alice.close().await.expect("Failed to close alice");
    bob.close().await.expect("Failed to close bob");
}

#[tokio::test]
async fn test_webrtc_replace_tracks_keeps_connection() {
    init_tracing();

    let (tx, _rx) = mpsc::channel(256);
    let first = LocalTrack::for_source(MediaSource::Microphone, "alice");
    let connection = ConnectionWrapper::new(
        SessionTag::new(pid("bob")),
        local_only(),
        &LocalTrackSet::new(Some(first), None, 1),
        tx,
    )
    .await
    .expect("Failed to create connection");

    let second = LocalTrack::for_source(MediaSource::Microphone, "alice-2");
    connection
        .replace_tracks(&LocalTrackSet::new(Some(second), None, 2))
        .await
        .expect("Failed to replace tracks");

    connection
        .replace_tracks(&LocalTrackSet::default())
        .await
        .expect("Failed to clear tracks");

    connection.close().await.expect("Failed to close");
}
