use crate::error::SignalingError;
use async_trait::async_trait;
use nearspace_core::{IceCandidate, ParticipantId};
use tokio::sync::watch;

/// Outbound half of the signaling relay as seen by the session layer.
///
/// Sends fail with [`SignalingError::NotReady`] until the relay handshake
/// has completed; callers retry instead of dropping the message.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// `true` once the relay has acknowledged our identity.
    fn readiness(&self) -> watch::Receiver<bool>;

    async fn send_offer(&self, target: ParticipantId, sdp: String) -> Result<(), SignalingError>;

    async fn send_answer(&self, target: ParticipantId, sdp: String) -> Result<(), SignalingError>;

    async fn send_candidate(
        &self,
        target: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Offer(String),
    Answer(String),
    Candidate(IceCandidate),
}

/// Session message addressed to us by another participant.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundSignal {
    pub from: ParticipantId,
    pub payload: SignalPayload,
}

impl InboundSignal {
    pub fn offer(from: impl Into<ParticipantId>, sdp: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            payload: SignalPayload::Offer(sdp.into()),
        }
    }

    pub fn answer(from: impl Into<ParticipantId>, sdp: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            payload: SignalPayload::Answer(sdp.into()),
        }
    }

    pub fn candidate(from: impl Into<ParticipantId>, candidate: IceCandidate) -> Self {
        Self {
            from: from.into(),
            payload: SignalPayload::Candidate(candidate),
        }
    }
}
