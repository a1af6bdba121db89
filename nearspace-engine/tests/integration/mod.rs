pub mod loopback_tests;
pub mod media_tests;
pub mod negotiation_tests;
pub mod proximity_tests;
pub mod transport_tests;

use nearspace_core::{Participant, ParticipantId, PositionUpdate, RoomId};
use nearspace_engine::{
    EngineConfig, LocalTrackSet, OrchestratorHandle, OrchestratorSnapshot, RemoteStreams,
    SessionOrchestrator,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::Level;

use crate::utils::{MockSignalingOutput, MockTransportFactory, SentSignal};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A running orchestrator wired to mocks.
pub struct TestNode {
    pub id: ParticipantId,
    pub handle: OrchestratorHandle,
    pub signaling: MockSignalingOutput,
    pub signal_rx: mpsc::UnboundedReceiver<SentSignal>,
    pub factory: MockTransportFactory,
    pub tracks: watch::Sender<LocalTrackSet>,
    pub remote_streams: RemoteStreams,
}

pub fn spawn_node(self_id: &str, ready: bool) -> TestNode {
    let config = EngineConfig {
        space_id: "space-1".into(),
        self_id: ParticipantId::from(self_id),
        ..Default::default()
    };

    let (signaling, signal_rx) = MockSignalingOutput::new(ready);
    let factory = MockTransportFactory::new();
    let (tracks, tracks_rx) = watch::channel(LocalTrackSet::default());

    let (orchestrator, handle) = SessionOrchestrator::new(
        config,
        Arc::new(signaling.clone()),
        Arc::new(factory.clone()),
        tracks_rx,
    );
    let remote_streams = orchestrator.remote_streams();

    tokio::spawn(async move {
        orchestrator.run().await;
    });

    TestNode {
        id: ParticipantId::from(self_id),
        handle,
        signaling,
        signal_rx,
        factory,
        tracks,
        remote_streams,
    }
}

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

pub fn update(x: f64, y: f64, room: Option<&str>) -> PositionUpdate {
    PositionUpdate {
        x,
        y,
        direction: Default::default(),
        is_walking: false,
        room_id: room.map(RoomId::from),
    }
}

pub fn participant(id: &str, x: f64, y: f64, room: Option<&str>) -> Participant {
    Participant::new(pid(id), id)
        .at(x, y)
        .in_room(room.map(RoomId::from))
}

/// Polls the orchestrator until `predicate` holds for its snapshot.
pub async fn wait_for_snapshot(
    handle: &OrchestratorHandle,
    timeout_ms: u64,
    predicate: impl Fn(&OrchestratorSnapshot) -> bool,
) -> OrchestratorSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let snapshot = handle.snapshot().await.expect("Orchestrator stopped");
        if predicate(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out waiting for orchestrator state: {:?}", snapshot);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Places the local participant at (100, 100) in open space with `others`
/// around it.
pub async fn place(node: &TestNode, others: Vec<Participant>) {
    node.handle
        .local_moved(update(100.0, 100.0, None))
        .await
        .expect("Failed to move");
    node.handle
        .participants_snapshot(others)
        .await
        .expect("Failed to send participants");
}
