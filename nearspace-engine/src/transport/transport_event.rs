use crate::media::TrackKind;
use async_trait::async_trait;
use nearspace_core::{IceCandidate, ParticipantId, SessionId};
use std::fmt;
use std::sync::Arc;

/// Identifies one incarnation of a peer session. Events carrying a tag that
/// no longer matches the live session are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTag {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
}

impl SessionTag {
    pub fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            session_id: SessionId::new(),
        }
    }
}

impl fmt::Display for SessionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.participant_id, self.session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Closed
        )
    }
}

/// Incoming media from a remote participant.
#[async_trait]
pub trait RemoteMediaTrack: Send + Sync {
    fn track_id(&self) -> String;

    fn stream_id(&self) -> String;

    fn kind(&self) -> TrackKind;

    /// Next RTP packet of the track.
    async fn read_packet(&self) -> anyhow::Result<webrtc::rtp::packet::Packet>;
}

pub enum TransportEvent {
    StateChanged(SessionTag, ConnectionState),
    CandidateGenerated(SessionTag, IceCandidate),
    RemoteTrack(SessionTag, Arc<dyn RemoteMediaTrack>),
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::StateChanged(tag, state) => {
                write!(f, "StateChanged({}, {:?})", tag, state)
            }
            TransportEvent::CandidateGenerated(tag, _) => write!(f, "CandidateGenerated({})", tag),
            TransportEvent::RemoteTrack(tag, track) => {
                write!(f, "RemoteTrack({}, {})", tag, track.track_id())
            }
        }
    }
}
