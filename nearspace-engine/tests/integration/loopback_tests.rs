use nearspace_core::ParticipantId;
use nearspace_engine::{InboundSignal, OrchestratorHandle};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::integration::{init_tracing, participant, pid, spawn_node, update, wait_for_snapshot};
use crate::utils::{SentSignal, TransportCall, wait_for_call};

/// Delivers everything `from` sends to `to`, stamped with the sender id the
/// way the relay does.
fn relay(
    from: ParticipantId,
    mut sent: mpsc::UnboundedReceiver<SentSignal>,
    to: OrchestratorHandle,
) {
    tokio::spawn(async move {
        while let Some(signal) = sent.recv().await {
            let inbound = match signal {
                SentSignal::Offer { sdp, .. } => InboundSignal::offer(from.clone(), sdp),
                SentSignal::Answer { sdp, .. } => InboundSignal::answer(from.clone(), sdp),
                SentSignal::Candidate { candidate, .. } => {
                    InboundSignal::candidate(from.clone(), candidate)
                }
            };
            if to.signal(inbound).await.is_err() {
                break;
            }
        }
    });
}

#[tokio::test]
async fn test_two_participants_negotiate_exactly_once() {
    init_tracing();

    let mut alice = spawn_node("alice", true);
    let mut bob = spawn_node("bob", true);

    let alice_sent = std::mem::replace(&mut alice.signal_rx, mpsc::unbounded_channel().1);
    let bob_sent = std::mem::replace(&mut bob.signal_rx, mpsc::unbounded_channel().1);
    relay(pid("alice"), alice_sent, bob.handle.clone());
    relay(pid("bob"), bob_sent, alice.handle.clone());

    // Both see each other at the same moment.
    alice.handle.local_moved(update(100.0, 100.0, None)).await.unwrap();
    bob.handle.local_moved(update(180.0, 100.0, None)).await.unwrap();
    alice
        .handle
        .participants_snapshot(vec![participant("bob", 180.0, 100.0, None)])
        .await
        .unwrap();
    bob.handle
        .participants_snapshot(vec![participant("alice", 100.0, 100.0, None)])
        .await
        .unwrap();

    let alice_view = wait_for_snapshot(&alice.handle, 2000, |s| s.has_session(&pid("bob"))).await;
    let bob_view = wait_for_snapshot(&bob.handle, 2000, |s| s.has_session(&pid("alice"))).await;

    assert!(alice_view.sessions[&pid("bob")].initiator);
    assert!(!bob_view.sessions[&pid("alice")].initiator);

    let alice_transport = alice.factory.latest_for(&pid("bob")).await.unwrap();
    wait_for_call(&alice_transport, 1, 2000, |c| matches!(c, TransportCall::ApplyAnswer(_))).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(alice.factory.created().await, 1);
    assert_eq!(bob.factory.created().await, 1);
    assert!(bob.signaling.offers_to(&pid("alice")).await.is_empty());
    assert_eq!(alice.signaling.offers_to(&pid("bob")).await.len(), 1);
    assert_eq!(bob.signaling.answers_to(&pid("alice")).await.len(), 1);
}

#[tokio::test]
async fn test_leaving_range_tears_down_both_sides() {
    init_tracing();

    let mut alice = spawn_node("alice", true);
    let mut bob = spawn_node("bob", true);

    let alice_sent = std::mem::replace(&mut alice.signal_rx, mpsc::unbounded_channel().1);
    let bob_sent = std::mem::replace(&mut bob.signal_rx, mpsc::unbounded_channel().1);
    relay(pid("alice"), alice_sent, bob.handle.clone());
    relay(pid("bob"), bob_sent, alice.handle.clone());

    alice.handle.local_moved(update(100.0, 100.0, None)).await.unwrap();
    bob.handle.local_moved(update(180.0, 100.0, None)).await.unwrap();
    alice
        .handle
        .participants_snapshot(vec![participant("bob", 180.0, 100.0, None)])
        .await
        .unwrap();
    bob.handle
        .participants_snapshot(vec![participant("alice", 100.0, 100.0, None)])
        .await
        .unwrap();
    wait_for_snapshot(&bob.handle, 2000, |s| s.has_session(&pid("alice"))).await;

    // Bob walks away; both sides learn the new position.
    bob.handle.local_moved(update(600.0, 100.0, None)).await.unwrap();
    alice
        .handle
        .send(nearspace_engine::SessionCommand::ParticipantMoved {
            participant_id: pid("bob"),
            update: update(600.0, 100.0, None),
        })
        .await
        .unwrap();

    wait_for_snapshot(&alice.handle, 2000, |s| s.sessions.is_empty()).await;
    wait_for_snapshot(&bob.handle, 2000, |s| s.sessions.is_empty()).await;
}
