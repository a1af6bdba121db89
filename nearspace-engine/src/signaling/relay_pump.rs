use crate::session::OrchestratorHandle;
use crate::signaling::RelayEvent;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Forwards relay events into the orchestrator until either side goes away.
pub async fn pump(mut events: mpsc::Receiver<RelayEvent>, handle: OrchestratorHandle) {
    while let Some(event) = events.recv().await {
        let result = match event {
            RelayEvent::Ready { connection_id } => {
                info!("Relay ready as connection {}", connection_id);
                Ok(())
            }
            RelayEvent::Presence(presence) => handle.apply_presence(presence).await,
            RelayEvent::Signal(signal) => handle.signal(signal).await,
            RelayEvent::Disconnected => {
                warn!("Relay disconnected, reconnecting; sessions stay up until their transports close");
                Ok(())
            }
        };

        if result.is_err() {
            info!("Orchestrator stopped, relay pump exiting");
            break;
        }
    }
}
