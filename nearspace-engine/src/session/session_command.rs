use crate::proximity::NearbySet;
use crate::session::SessionState;
use crate::signaling::InboundSignal;
use nearspace_core::{MediaFlags, Participant, ParticipantId, PositionUpdate, SessionId};
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// Inputs of the orchestrator loop.
#[derive(Debug)]
pub enum SessionCommand {
    /// The local avatar moved or changed room.
    LocalMoved(PositionUpdate),

    /// Full list of participants already in the space.
    ParticipantsSnapshot(Vec<Participant>),

    ParticipantJoined(Participant),

    ParticipantMoved {
        participant_id: ParticipantId,
        update: PositionUpdate,
    },

    ParticipantMediaChanged {
        participant_id: ParticipantId,
        flags: MediaFlags,
    },

    ParticipantLeft(ParticipantId),

    /// Offer, answer or candidate from a remote participant.
    Signal(InboundSignal),

    /// Deferred initiation while the relay was not ready yet.
    RetryInitiate {
        participant_id: ParticipantId,
        attempt: u32,
    },

    Snapshot(oneshot::Sender<OrchestratorSnapshot>),

    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub state: SessionState,
    pub initiator: bool,
    pub local_media_attached: bool,
    pub has_remote_stream: bool,
}

/// Point-in-time view of the orchestrator for UIs and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorSnapshot {
    pub ready: bool,
    pub nearby: NearbySet,
    pub sessions: BTreeMap<ParticipantId, SessionSummary>,
    pub participants: usize,
}

impl OrchestratorSnapshot {
    pub fn has_session(&self, participant_id: &ParticipantId) -> bool {
        self.sessions.contains_key(participant_id)
    }
}
