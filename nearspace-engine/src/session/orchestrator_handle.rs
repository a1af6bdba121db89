use crate::error::EngineError;
use crate::session::{OrchestratorSnapshot, SessionCommand};
use crate::signaling::{InboundSignal, PresenceEvent};
use nearspace_core::{Participant, PositionUpdate};
use tokio::sync::{mpsc, oneshot};

/// Cloneable entry point into a running [`SessionOrchestrator`](crate::session::SessionOrchestrator).
#[derive(Clone)]
pub struct OrchestratorHandle {
    command_tx: mpsc::Sender<SessionCommand>,
}

impl OrchestratorHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { command_tx }
    }

    pub async fn send(&self, cmd: SessionCommand) -> Result<(), EngineError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::Stopped)
    }

    pub async fn local_moved(&self, update: PositionUpdate) -> Result<(), EngineError> {
        self.send(SessionCommand::LocalMoved(update)).await
    }

    pub async fn participants_snapshot(&self, players: Vec<Participant>) -> Result<(), EngineError> {
        self.send(SessionCommand::ParticipantsSnapshot(players)).await
    }

    pub async fn apply_presence(&self, event: PresenceEvent) -> Result<(), EngineError> {
        let cmd = match event {
            PresenceEvent::Snapshot(players) => SessionCommand::ParticipantsSnapshot(players),
            PresenceEvent::Joined(participant) => SessionCommand::ParticipantJoined(participant),
            PresenceEvent::Moved {
                participant_id,
                update,
            } => SessionCommand::ParticipantMoved {
                participant_id,
                update,
            },
            PresenceEvent::MediaChanged {
                participant_id,
                flags,
            } => SessionCommand::ParticipantMediaChanged {
                participant_id,
                flags,
            },
            PresenceEvent::Left(participant_id) => SessionCommand::ParticipantLeft(participant_id),
        };
        self.send(cmd).await
    }

    pub async fn signal(&self, signal: InboundSignal) -> Result<(), EngineError> {
        self.send(SessionCommand::Signal(signal)).await
    }

    pub async fn snapshot(&self) -> Result<OrchestratorSnapshot, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(SessionCommand::Shutdown).await
    }
}
