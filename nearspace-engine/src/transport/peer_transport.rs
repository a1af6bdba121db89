use crate::media::LocalTrackSet;
use crate::transport::{SessionTag, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use nearspace_core::IceCandidate;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One real-time connection to one remote participant.
///
/// Methods take and return raw SDP strings; the session layer wraps them
/// into signaling messages.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates an offer and sets it as the local description.
    async fn create_offer(&self) -> Result<String>;

    /// Applies a remote offer and returns the local answer.
    async fn accept_offer(&self, sdp: String) -> Result<String>;

    /// Applies a remote answer. Returns `false` when the connection was not
    /// waiting for one and the answer was ignored.
    async fn apply_answer(&self, sdp: String) -> Result<bool>;

    /// Withdraws an outstanding local offer so a remote offer can be
    /// applied on the same connection. No-op when no offer is outstanding.
    async fn rollback(&self) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swaps the outgoing tracks in place without renegotiating.
    async fn replace_tracks(&self, tracks: &LocalTrackSet) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates transports for new sessions.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        tag: SessionTag,
        tracks: &LocalTrackSet,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
