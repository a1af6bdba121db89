use nearspace_core::IceCandidate;
use nearspace_engine::{InboundSignal, LocalTrack, LocalTrackSet, MediaSource};
use std::time::Duration;

use crate::integration::{init_tracing, participant, pid, place, spawn_node};
use crate::utils::{TransportCall, wait_for_call};

#[tokio::test]
async fn test_inbound_offer_creates_reactive_session() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("alice", 150.0, 100.0, None)]).await;

    node.handle
        .signal(InboundSignal::offer("alice", "offer-from-alice"))
        .await
        .unwrap();

    let answers = node.signaling.wait_for_answers(&pid("alice"), 1, 2000).await;
    assert!(answers[0].starts_with("answer:"));

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(!snapshot.sessions[&pid("alice")].initiator);

    let transport = node.factory.latest_for(&pid("alice")).await.unwrap();
    assert_eq!(
        transport.calls().await,
        vec![TransportCall::AcceptOffer("offer-from-alice".into())]
    );
}

#[tokio::test]
async fn test_offer_from_participant_not_yet_nearby_is_answered() {
    init_tracing();

    let node = spawn_node("bob", true);

    node.handle
        .signal(InboundSignal::offer("alice", "offer-from-alice"))
        .await
        .unwrap();

    node.signaling.wait_for_answers(&pid("alice"), 1, 2000).await;
    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(snapshot.has_session(&pid("alice")));
    assert!(snapshot.nearby.is_empty());
}

#[tokio::test]
async fn test_late_answer_is_ignored() {
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
    node.handle.snapshot().await.unwrap();

    node.handle
        .signal(InboundSignal::answer("carol", "answer-2"))
        .await
        .unwrap();
    node.handle.snapshot().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        transport
            .count(|c| matches!(c, TransportCall::ApplyAnswer(_)))
            .await,
        1
    );
    assert!(node.handle.snapshot().await.unwrap().has_session(&pid("carol")));
}

#[tokio::test]
async fn test_candidates_flow_both_ways() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    let transport = node.factory.wait_for_transports(&pid("carol"), 1, 2000).await[0].clone();

    let remote = IceCandidate {
        candidate: "candidate:1 1 udp 1 10.0.0.2 5000 typ host".into(),
        ..Default::default()
    };
    node.handle
        .signal(InboundSignal::candidate("carol", remote.clone()))
        .await
        .unwrap();
    wait_for_call(&transport, 1, 2000, |c| c == &TransportCall::AddCandidate(remote.clone())).await;

    transport
        .emit_candidate("candidate:2 1 udp 1 10.0.0.1 5000 typ host")
        .await;

    let mut sent = Vec::new();
    for _ in 0..200 {
        sent = node.signaling.candidates_to(&pid("carol")).await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sdp_mid.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_candidate_without_session_is_dropped() {
    init_tracing();

    let node = spawn_node("bob", true);

    node.handle
        .signal(InboundSignal::candidate("dave", IceCandidate::default()))
        .await
        .unwrap();

    let snapshot = node.handle.snapshot().await.unwrap();
    assert!(snapshot.sessions.is_empty());
    assert_eq!(node.factory.created().await, 0);
}

#[tokio::test]
async fn test_colliding_offer_is_ignored_by_lower_id() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("carol", 200.0, 100.0, None)]).await;
    node.signaling.wait_for_offers(&pid("carol"), 1, 2000).await;
    let before = node.handle.snapshot().await.unwrap().sessions[&pid("carol")].session_id;

    node.handle
        .signal(InboundSignal::offer("carol", "offer-from-carol"))
        .await
        .unwrap();

    let after = node.handle.snapshot().await.unwrap();
    assert_eq!(after.sessions[&pid("carol")].session_id, before);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(node.signaling.answers_to(&pid("carol")).await.is_empty());
    assert_eq!(node.factory.created().await, 1);
}

#[tokio::test]
async fn test_colliding_renegotiation_rolls_back_on_same_connection() {
    init_tracing();

    let node = spawn_node("bob", true);
    place(&node, vec![participant("alice", 150.0, 100.0, None)]).await;

    node.handle
        .signal(InboundSignal::offer("alice", "offer-1"))
        .await
        .unwrap();
    node.signaling.wait_for_answers(&pid("alice"), 1, 2000).await;
    let before = node.handle.snapshot().await.unwrap().sessions[&pid("alice")].session_id;

    // Our own media change starts a renegotiation towards alice.
    let mic = LocalTrack::for_source(MediaSource::Microphone, "bob");
    node.tracks.send_replace(LocalTrackSet::new(Some(mic), None, 1));
    node.signaling.wait_for_offers(&pid("alice"), 1, 2000).await;

    node.handle
        .signal(InboundSignal::offer("alice", "offer-2"))
        .await
        .unwrap();

    node.signaling.wait_for_answers(&pid("alice"), 2, 2000).await;
    // The withdrawn change is offered again once alice's exchange is done.
    node.signaling.wait_for_offers(&pid("alice"), 2, 2000).await;

    let transports = node.factory.transports_for(&pid("alice")).await;
    assert_eq!(transports.len(), 1);
    assert!(!transports[0].is_closed().await);

    let calls = transports[0].calls().await;
    let rollback = calls.iter().position(|c| c == &TransportCall::Rollback);
    let accept = calls
        .iter()
        .position(|c| c == &TransportCall::AcceptOffer("offer-2".into()));
    assert!(rollback.is_some());
    assert!(rollback < accept);

    let after = node.handle.snapshot().await.unwrap().sessions[&pid("alice")].session_id;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_rejected_renegotiation_is_answered_on_fresh_session() {
    init_tracing();

    let node = spawn_node("bob", true);
    node.factory.reject_renegotiation(true);
    place(&node, vec![participant("alice", 150.0, 100.0, None)]).await;

    node.handle
        .signal(InboundSignal::offer("alice", "offer-1"))
        .await
        .unwrap();
    node.signaling.wait_for_answers(&pid("alice"), 1, 2000).await;
    let first = node.handle.snapshot().await.unwrap().sessions[&pid("alice")].session_id;

    node.handle
        .signal(InboundSignal::offer("alice", "offer-2"))
        .await
        .unwrap();

    node.signaling.wait_for_answers(&pid("alice"), 2, 2000).await;
    let snapshot = node.handle.snapshot().await.unwrap();
    assert_ne!(snapshot.sessions[&pid("alice")].session_id, first);

    let transports = node.factory.transports_for(&pid("alice")).await;
    assert_eq!(transports.len(), 2);
    wait_for_call(&transports[0], 1, 2000, |c| c == &TransportCall::Close).await;
}
