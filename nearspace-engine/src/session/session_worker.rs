use crate::media::LocalTrackSet;
use crate::transport::{PeerTransport, SessionTag};
use nearspace_core::IceCandidate;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Asynchronous transport work for one session, executed in order.
#[derive(Debug)]
pub enum SessionOp {
    CreateOffer,
    Rollback,
    AcceptOffer(String),
    ApplyAnswer(String),
    AddCandidate(IceCandidate),
    ReplaceTracks(LocalTrackSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    CreateOffer,
    ApplyAnswer,
    ReplaceTracks,
}

/// Results reported back to the orchestrator loop, tagged with the session
/// they belong to.
#[derive(Debug)]
pub enum NegotiationEvent {
    OfferCreated(SessionTag, String),
    AnswerCreated(SessionTag, String),
    AnswerApplied(SessionTag, bool),
    /// The remote offer could not be applied. Carries the offer so it can be
    /// retried on a fresh connection.
    OfferRejected(SessionTag, String, String),
    Failed(SessionTag, NegotiationStep, String),
}

/// Spawns the task that owns `transport`'s negotiation steps. Aborting the
/// returned handle cancels whatever step is in flight.
pub fn spawn_session_worker(
    tag: SessionTag,
    transport: Arc<dyn PeerTransport>,
    events: mpsc::Sender<NegotiationEvent>,
) -> (mpsc::UnboundedSender<SessionOp>, JoinHandle<()>) {
    let (ops_tx, mut ops_rx) = mpsc::unbounded_channel::<SessionOp>();

    let worker = tokio::spawn(async move {
        while let Some(op) = ops_rx.recv().await {
            debug!("Session {} running {:?}", tag, op);

            let event = match op {
                SessionOp::CreateOffer => match transport.create_offer().await {
                    Ok(sdp) => NegotiationEvent::OfferCreated(tag.clone(), sdp),
                    Err(e) => NegotiationEvent::Failed(
                        tag.clone(),
                        NegotiationStep::CreateOffer,
                        format!("{:#}", e),
                    ),
                },

                // A failed rollback leaves the local offer in place; the
                // following AcceptOffer then reports the rejection.
                SessionOp::Rollback => {
                    if let Err(e) = transport.rollback().await {
                        warn!("Failed to roll back local offer for {}: {:#}", tag, e);
                    }
                    continue;
                }

                SessionOp::AcceptOffer(offer) => match transport.accept_offer(offer.clone()).await {
                    Ok(sdp) => NegotiationEvent::AnswerCreated(tag.clone(), sdp),
                    Err(e) => NegotiationEvent::OfferRejected(tag.clone(), offer, format!("{:#}", e)),
                },

                SessionOp::ApplyAnswer(answer) => match transport.apply_answer(answer).await {
                    Ok(applied) => NegotiationEvent::AnswerApplied(tag.clone(), applied),
                    Err(e) => NegotiationEvent::Failed(
                        tag.clone(),
                        NegotiationStep::ApplyAnswer,
                        format!("{:#}", e),
                    ),
                },

                SessionOp::AddCandidate(candidate) => {
                    if let Err(e) = transport.add_ice_candidate(candidate).await {
                        warn!("Failed to add ICE candidate for {}: {:?}", tag, e);
                    }
                    continue;
                }

                SessionOp::ReplaceTracks(tracks) => match transport.replace_tracks(&tracks).await {
                    Ok(()) => continue,
                    Err(e) => NegotiationEvent::Failed(
                        tag.clone(),
                        NegotiationStep::ReplaceTracks,
                        format!("{:#}", e),
                    ),
                },
            };

            if events.send(event).await.is_err() {
                break;
            }
        }
    });

    (ops_tx, worker)
}
