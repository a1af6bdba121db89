use crate::session::SessionOp;
use crate::transport::{PeerTransport, SessionTag};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Negotiating,
    Connected,
}

/// Where the session stands in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingPhase {
    Idle,
    CreatingOffer,
    AwaitingAnswer,
    Answering,
}

impl SignalingPhase {
    /// A local offer exists that the remote has not answered yet.
    pub fn has_local_offer(&self) -> bool {
        matches!(self, SignalingPhase::CreatingOffer | SignalingPhase::AwaitingAnswer)
    }
}

/// One managed connection to one remote participant.
pub struct PeerSession {
    pub tag: SessionTag,
    pub state: SessionState,
    pub phase: SignalingPhase,
    pub initiator: bool,
    /// At least one offer/answer exchange completed on this connection.
    pub negotiated: bool,
    pub renegotiation_pending: bool,
    pub local_media_attached: bool,
    pub media_generation: u64,
    transport: Arc<dyn PeerTransport>,
    ops: mpsc::UnboundedSender<SessionOp>,
    worker: JoinHandle<()>,
}

impl PeerSession {
    pub fn new(
        tag: SessionTag,
        initiator: bool,
        transport: Arc<dyn PeerTransport>,
        ops: mpsc::UnboundedSender<SessionOp>,
        worker: JoinHandle<()>,
    ) -> Self {
        Self {
            tag,
            state: SessionState::Negotiating,
            phase: SignalingPhase::Idle,
            initiator,
            negotiated: false,
            renegotiation_pending: false,
            local_media_attached: false,
            media_generation: 0,
            transport,
            ops,
            worker,
        }
    }

    pub fn submit(&self, op: SessionOp) {
        if self.ops.send(op).is_err() {
            warn!("Session worker for {} is gone", self.tag);
        }
    }

    /// Stops the worker and closes the transport in the background. The
    /// session must already be unreachable from the session map.
    pub fn dispose(self) {
        self.worker.abort();

        let tag = self.tag;
        let transport = self.transport;
        tokio::spawn(async move {
            if let Err(e) = transport.close().await {
                warn!("Error closing transport for {}: {:?}", tag, e);
            }
        });
    }
}
