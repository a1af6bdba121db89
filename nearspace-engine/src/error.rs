use nearspace_core::ParticipantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("relay handshake not completed")]
    NotReady,

    #[error("relay connection closed")]
    ChannelClosed,

    #[error("failed to encode signal for {0}: {1}")]
    Encode(ParticipantId, serde_json::Error),

    #[error("relay connection failed: {0}")]
    Connect(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission denied for {0}")]
    PermissionDenied(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("orchestrator is not running")]
    Stopped,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
