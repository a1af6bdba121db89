use crate::signaling::{InboundSignal, SignalPayload};
use nearspace_core::{MediaFlags, Participant, ParticipantId, PositionUpdate, SignalMessage};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    Snapshot(Vec<Participant>),
    Joined(Participant),
    Moved {
        participant_id: ParticipantId,
        update: PositionUpdate,
    },
    MediaChanged {
        participant_id: ParticipantId,
        flags: MediaFlags,
    },
    Left(ParticipantId),
}

/// What the relay told us, decoded from its wire frames.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Ready { connection_id: String },
    Presence(PresenceEvent),
    Signal(InboundSignal),
    Disconnected,
}

impl RelayEvent {
    /// Maps an inbound frame to an event. Frames that only flow from client
    /// to relay, and session frames without a sender, yield `None`.
    pub fn translate(msg: SignalMessage) -> Option<Self> {
        let event = match msg {
            SignalMessage::Welcome { connection_id } => RelayEvent::Ready { connection_id },
            SignalMessage::PlayersList { players } => {
                RelayEvent::Presence(PresenceEvent::Snapshot(players))
            }
            SignalMessage::PlayerJoined { player } => {
                RelayEvent::Presence(PresenceEvent::Joined(player))
            }
            SignalMessage::PlayerLeft { participant_id } => {
                RelayEvent::Presence(PresenceEvent::Left(participant_id))
            }
            SignalMessage::PlayerMoved {
                participant_id,
                update,
            } => RelayEvent::Presence(PresenceEvent::Moved {
                participant_id,
                update,
            }),
            SignalMessage::MediaChanged {
                participant_id,
                flags,
            } => RelayEvent::Presence(PresenceEvent::MediaChanged {
                participant_id,
                flags,
            }),
            SignalMessage::SessionOffer {
                from_participant_id,
                offer,
                ..
            } => Self::signal(from_participant_id, SignalPayload::Offer(offer.sdp))?,
            SignalMessage::SessionAnswer {
                from_participant_id,
                answer,
                ..
            } => Self::signal(from_participant_id, SignalPayload::Answer(answer.sdp))?,
            SignalMessage::ConnectivityCandidate {
                from_participant_id,
                candidate,
                ..
            } => Self::signal(from_participant_id, SignalPayload::Candidate(candidate))?,
            SignalMessage::Join { .. }
            | SignalMessage::PlayerMove { .. }
            | SignalMessage::MediaToggle { .. } => return None,
        };

        Some(event)
    }

    fn signal(from: Option<ParticipantId>, payload: SignalPayload) -> Option<Self> {
        let Some(from) = from else {
            warn!("Dropping session message without sender");
            return None;
        };
        Some(RelayEvent::Signal(InboundSignal { from, payload }))
    }
}
