use crate::model::participant::{MediaFlags, Participant, ParticipantId, PositionUpdate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Same JSON shape as a browser `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Same JSON shape as a browser `RTCIceCandidateInit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Frames exchanged with the signaling relay.
///
/// Session messages are addressed by `target_participant_id`; the relay
/// stamps `from_participant_id` on the copy it delivers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalMessage {
    Join {
        space_id: String,
        participant_id: ParticipantId,
        display_name: String,
        x: f64,
        y: f64,
    },
    Welcome {
        connection_id: String,
    },
    PlayersList {
        players: Vec<Participant>,
    },
    PlayerJoined {
        player: Participant,
    },
    PlayerLeft {
        participant_id: ParticipantId,
    },
    PlayerMove {
        space_id: String,
        update: PositionUpdate,
    },
    PlayerMoved {
        participant_id: ParticipantId,
        update: PositionUpdate,
    },
    MediaToggle {
        space_id: String,
        flags: MediaFlags,
    },
    MediaChanged {
        participant_id: ParticipantId,
        flags: MediaFlags,
    },
    SessionOffer {
        space_id: String,
        target_participant_id: ParticipantId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
        offer: SessionDescription,
    },
    SessionAnswer {
        space_id: String,
        target_participant_id: ParticipantId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
        answer: SessionDescription,
    },
    ConnectivityCandidate {
        space_id: String,
        target_participant_id: ParticipantId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_participant_id: Option<ParticipantId>,
        candidate: IceCandidate,
    },
}
