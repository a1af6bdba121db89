use crate::config::{EngineConfig, SPAWN_POSITION};
use crate::media::LocalTrackSet;
use crate::proximity::{NearbyDiff, NearbySet, ParticipantStore, ProximityEngine};
use crate::session::{
    NegotiationEvent, OrchestratorHandle, OrchestratorSnapshot, PeerSession, RemoteStreams,
    SessionCommand, SessionOp, SessionState, SessionSummary, SignalingPhase,
    spawn_session_worker,
};
use crate::signaling::{InboundSignal, SignalPayload, SignalingOutput};
use crate::transport::{ConnectionState, SessionTag, TransportEvent, TransportFactory};
use nearspace_core::{Participant, ParticipantId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Keeps exactly one peer session per nearby participant.
///
/// All state lives in this struct and is only touched from [`run`](Self::run).
/// Asynchronous transport work happens in per-session workers whose results
/// come back tagged with the session they were started for; results for a
/// session that has since been disposed are dropped.
pub struct SessionOrchestrator {
    config: EngineConfig,
    proximity: ProximityEngine,
    local: Participant,
    participants: ParticipantStore,
    nearby: NearbySet,
    sessions: HashMap<ParticipantId, PeerSession>,
    remote_streams: RemoteStreams,
    pending_retries: HashSet<ParticipantId>,
    signaling: Arc<dyn SignalingOutput>,
    factory: Arc<dyn TransportFactory>,
    readiness: watch::Receiver<bool>,
    tracks: watch::Receiver<LocalTrackSet>,
    command_rx: mpsc::Receiver<SessionCommand>,
    command_tx: mpsc::WeakSender<SessionCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    negotiation_rx: mpsc::Receiver<NegotiationEvent>,
    negotiation_tx: mpsc::Sender<NegotiationEvent>,
}

impl SessionOrchestrator {
    pub fn new(
        config: EngineConfig,
        signaling: Arc<dyn SignalingOutput>,
        factory: Arc<dyn TransportFactory>,
        tracks: watch::Receiver<LocalTrackSet>,
    ) -> (Self, OrchestratorHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (negotiation_tx, negotiation_rx) = mpsc::channel(256);

        let local = Participant::new(config.self_id.clone(), config.display_name.clone())
            .at(SPAWN_POSITION.x, SPAWN_POSITION.y);

        let orchestrator = Self {
            proximity: ProximityEngine::new(config.proximity_radius),
            participants: ParticipantStore::new(config.self_id.clone()),
            local,
            nearby: NearbySet::new(),
            sessions: HashMap::new(),
            remote_streams: RemoteStreams::new(),
            pending_retries: HashSet::new(),
            readiness: signaling.readiness(),
            signaling,
            factory,
            tracks,
            command_rx,
            command_tx: command_tx.downgrade(),
            transport_rx,
            transport_tx,
            negotiation_rx,
            negotiation_tx,
            config,
        };

        (orchestrator, OrchestratorHandle::new(command_tx))
    }

    pub fn remote_streams(&self) -> RemoteStreams {
        self.remote_streams.clone()
    }

    pub async fn run(mut self) {
        info!("Session orchestrator started for {}", self.config.self_id);

        let mut readiness_open = true;
        let mut tracks_open = true;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down orchestrator.");
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                Some(evt) = self.negotiation_rx.recv() => {
                    self.handle_negotiation_event(evt).await;
                }

                changed = self.readiness.changed(), if readiness_open => {
                    match changed {
                        Ok(()) => self.on_readiness_changed().await,
                        Err(_) => readiness_open = false,
                    }
                }

                changed = self.tracks.changed(), if tracks_open => {
                    match changed {
                        Ok(()) => self.on_local_tracks_changed(),
                        Err(_) => tracks_open = false,
                    }
                }
            }
        }

        self.dispose_all("orchestrator stopped");
        info!("Session orchestrator finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::LocalMoved(update) => {
                self.local.apply_update(&update);
                self.reconcile().await;
            }

            SessionCommand::ParticipantsSnapshot(players) => {
                info!("Received {} participants", players.len());
                self.participants.replace_all(players);
                self.reconcile().await;
            }

            SessionCommand::ParticipantJoined(participant) => {
                let participant_id = participant.participant_id.clone();
                if !self.participants.upsert(participant) {
                    return;
                }
                info!("Participant {} joined", participant_id);
                // A session from before a reload points at a dead connection.
                self.dispose(&participant_id, "participant rejoined");
                self.reconcile().await;
            }

            SessionCommand::ParticipantMoved {
                participant_id,
                update,
            } => {
                if self.participants.apply_move(&participant_id, &update) {
                    self.reconcile().await;
                }
            }

            SessionCommand::ParticipantMediaChanged {
                participant_id,
                flags,
            } => {
                if self.participants.set_media(&participant_id, flags) {
                    debug!("Participant {} media: {:?}", participant_id, flags);
                }
            }

            SessionCommand::ParticipantLeft(participant_id) => {
                info!("Participant {} left the space", participant_id);
                self.participants.remove(&participant_id);
                self.dispose(&participant_id, "participant left the space");
                self.reconcile().await;
            }

            SessionCommand::Signal(signal) => self.handle_signal(signal).await,

            SessionCommand::RetryInitiate {
                participant_id,
                attempt,
            } => {
                self.pending_retries.remove(&participant_id);
                self.initiate(participant_id, attempt).await;
            }

            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }

            SessionCommand::Shutdown => {}
        }
    }

    /// Recomputes the nearby set and brings sessions in line with it:
    /// dispose for participants that left, initiate for those that entered,
    /// and retry for nearby participants that still have no session.
    async fn reconcile(&mut self) {
        let next = self
            .proximity
            .compute_nearby(&self.local, self.participants.iter());
        let diff = NearbyDiff::between(&self.nearby, &next);
        self.nearby = next;

        if !diff.is_empty() {
            debug!(
                "Nearby set changed: +{:?} -{:?}",
                diff.entered, diff.left
            );
        }

        for participant_id in &diff.left {
            self.dispose(participant_id, "left proximity");
        }

        for participant_id in diff.entered {
            self.initiate(participant_id, 0).await;
        }

        for participant_id in diff.retained {
            if self.sessions.contains_key(&participant_id) {
                continue;
            }
            debug!("Healing check for {}", participant_id);
            self.initiate(participant_id, 0).await;
        }
    }

    async fn initiate(&mut self, participant_id: ParticipantId, attempt: u32) {
        if !self.config.self_id.initiates_with(&participant_id) {
            debug!("Waiting for offer from {}", participant_id);
            return;
        }
        if self.sessions.contains_key(&participant_id) || !self.nearby.contains(&participant_id) {
            return;
        }

        let ready = *self.readiness.borrow();
        if !ready {
            if attempt < self.config.signaling_retry_attempts {
                debug!(
                    "Relay not ready, retrying offer to {} in {:?}",
                    participant_id,
                    self.config.retry_delay()
                );
                self.schedule_retry(participant_id, attempt + 1);
            } else {
                info!(
                    "Relay not ready, offer to {} waits for the next healing pass",
                    participant_id
                );
            }
            return;
        }

        if self.open_session(participant_id.clone(), true).await {
            info!("Initiating session with {}", participant_id);
            self.start_offer(&participant_id);
        }
    }

    fn schedule_retry(&mut self, participant_id: ParticipantId, attempt: u32) {
        if !self.pending_retries.insert(participant_id.clone()) {
            return;
        }

        let command_tx = self.command_tx.clone();
        let delay = self.config.retry_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(tx) = command_tx.upgrade() else {
                return;
            };
            let _ = tx
                .send(SessionCommand::RetryInitiate {
                    participant_id,
                    attempt,
                })
                .await;
        });
    }

    async fn open_session(&mut self, participant_id: ParticipantId, initiator: bool) -> bool {
        let tag = SessionTag::new(participant_id.clone());
        let tracks = self.tracks.borrow().clone();

        let transport = match self
            .factory
            .create(tag.clone(), &tracks, self.transport_tx.clone())
            .await
        {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to create transport for {}: {:?}", participant_id, e);
                return false;
            }
        };

        let (ops, worker) =
            spawn_session_worker(tag.clone(), transport.clone(), self.negotiation_tx.clone());

        let mut session = PeerSession::new(tag, initiator, transport, ops, worker);
        session.local_media_attached = !tracks.is_empty();
        session.media_generation = tracks.generation();
        info!("Session {} created (initiator: {})", session.tag, initiator);

        if let Some(previous) = self.sessions.insert(participant_id, session) {
            warn!("Replaced existing session {}", previous.tag);
            previous.dispose();
        }
        true
    }

    fn start_offer(&mut self, participant_id: &ParticipantId) {
        let Some(session) = self.sessions.get_mut(participant_id) else {
            return;
        };

        if session.phase != SignalingPhase::Idle {
            session.renegotiation_pending = true;
            return;
        }

        session.phase = SignalingPhase::CreatingOffer;
        session.renegotiation_pending = false;
        session.submit(SessionOp::CreateOffer);
    }

    async fn handle_signal(&mut self, signal: InboundSignal) {
        let InboundSignal { from, payload } = signal;

        match payload {
            SignalPayload::Offer(sdp) => self.on_remote_offer(from, sdp).await,

            SignalPayload::Answer(sdp) => {
                let Some(session) = self.sessions.get(&from) else {
                    warn!("Dropping answer from {}: no session", from);
                    return;
                };
                if session.phase != SignalingPhase::AwaitingAnswer {
                    warn!("Dropping answer from {}: no offer outstanding", from);
                    return;
                }
                session.submit(SessionOp::ApplyAnswer(sdp));
            }

            SignalPayload::Candidate(candidate) => match self.sessions.get(&from) {
                Some(session) => session.submit(SessionOp::AddCandidate(candidate)),
                None => debug!("Dropping candidate from {}: no session", from),
            },
        }
    }

    /// Offers are accepted whatever our own nearby set says: the remote side
    /// only offers when it considers us nearby.
    async fn on_remote_offer(&mut self, from: ParticipantId, sdp: String) {
        let colliding = self
            .sessions
            .get(&from)
            .is_some_and(|session| session.phase.has_local_offer());

        if colliding {
            if self.config.self_id.initiates_with(&from) {
                info!("Ignoring colliding offer from {}", from);
                return;
            }

            let negotiated = self.sessions.get(&from).is_some_and(|s| s.negotiated);
            if negotiated {
                // Keep the connection: withdraw our offer, answer theirs and
                // offer our own change once that exchange is done.
                info!("Offer collision with {}, rolling back our offer", from);
                if let Some(session) = self.sessions.get_mut(&from) {
                    session.submit(SessionOp::Rollback);
                    session.renegotiation_pending = true;
                }
            } else {
                info!("Offer collision with {}, yielding", from);
                self.dispose(&from, "offer collision");
            }
        }

        if !self.sessions.contains_key(&from) {
            if !self.open_session(from.clone(), false).await {
                return;
            }
            info!("Accepting offer from {} on a new session", from);
        }

        if let Some(session) = self.sessions.get_mut(&from) {
            session.phase = SignalingPhase::Answering;
            session.submit(SessionOp::AcceptOffer(sdp));
        }
    }

    async fn handle_negotiation_event(&mut self, event: NegotiationEvent) {
        match event {
            NegotiationEvent::OfferCreated(tag, sdp) => {
                if !self.is_live(&tag) {
                    debug!("Discarding offer for stale session {}", tag);
                    return;
                }
                if !self.has_phase(&tag, SignalingPhase::CreatingOffer) {
                    debug!("Discarding offer for {}: rolled back", tag);
                    return;
                }

                match self
                    .signaling
                    .send_offer(tag.participant_id.clone(), sdp)
                    .await
                {
                    Ok(()) => {
                        info!("Offer sent to {}", tag.participant_id);
                        if let Some(session) = self.live_session(&tag) {
                            session.phase = SignalingPhase::AwaitingAnswer;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to send offer to {}: {}", tag.participant_id, e);
                        self.dispose(&tag.participant_id, "offer not delivered");
                        self.schedule_retry(tag.participant_id, 0);
                    }
                }
            }

            NegotiationEvent::AnswerCreated(tag, sdp) => {
                if !self.is_live(&tag) {
                    debug!("Discarding answer for stale session {}", tag);
                    return;
                }

                match self
                    .signaling
                    .send_answer(tag.participant_id.clone(), sdp)
                    .await
                {
                    Ok(()) => {
                        info!("Answer sent to {}", tag.participant_id);
                        self.finish_exchange(&tag, true);
                    }
                    Err(e) => {
                        warn!("Failed to send answer to {}: {}", tag.participant_id, e);
                        self.dispose(&tag.participant_id, "answer not delivered");
                    }
                }
            }

            NegotiationEvent::AnswerApplied(tag, applied) => {
                if !applied {
                    debug!("Answer from {} ignored, connection already stable", tag.participant_id);
                }
                self.finish_exchange(&tag, applied);
            }

            NegotiationEvent::OfferRejected(tag, offer, err) => {
                let Some(session) = self.live_session(&tag) else {
                    return;
                };
                let retry_fresh = session.negotiated;

                warn!("Offer from {} rejected: {}", tag.participant_id, err);
                self.dispose(&tag.participant_id, "remote offer rejected");

                // The remote may have replaced its connection; answer it on
                // a fresh one.
                if retry_fresh {
                    info!("Retrying offer from {} on a fresh connection", tag.participant_id);
                    self.on_remote_offer(tag.participant_id, offer).await;
                }
            }

            NegotiationEvent::Failed(tag, step, err) => {
                if !self.is_live(&tag) {
                    return;
                }
                warn!(
                    "Negotiation step {:?} failed for {}: {}",
                    step, tag.participant_id, err
                );
                self.dispose(&tag.participant_id, "negotiation failed");
            }
        }
    }

    /// Marks the current offer/answer round as done and starts a queued
    /// renegotiation, if any.
    fn finish_exchange(&mut self, tag: &SessionTag, negotiated: bool) {
        let Some(session) = self.live_session(tag) else {
            return;
        };

        session.phase = SignalingPhase::Idle;
        session.negotiated |= negotiated;

        if session.renegotiation_pending {
            debug!("Starting queued renegotiation with {}", tag.participant_id);
            self.start_offer(&tag.participant_id);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::StateChanged(tag, state) => {
                let Some(session) = self.live_session(&tag) else {
                    return;
                };

                if state == ConnectionState::Connected {
                    if session.state != SessionState::Connected {
                        info!("Session {} connected", tag);
                        session.state = SessionState::Connected;
                    }
                } else if state.is_terminal() {
                    info!("Transport for {} reported {:?}", tag.participant_id, state);
                    self.dispose(&tag.participant_id, "connection lost");
                    self.schedule_retry(tag.participant_id, 0);
                }
            }

            TransportEvent::CandidateGenerated(tag, candidate) => {
                if !self.is_live(&tag) {
                    return;
                }
                if let Err(e) = self
                    .signaling
                    .send_candidate(tag.participant_id.clone(), candidate)
                    .await
                {
                    warn!("Failed to send candidate to {}: {}", tag.participant_id, e);
                }
            }

            TransportEvent::RemoteTrack(tag, track) => {
                if !self.is_live(&tag) {
                    debug!("Ignoring track for stale session {}", tag);
                    return;
                }
                info!("Remote {:?} track from {}", track.kind(), tag.participant_id);
                self.remote_streams.add_track(&tag, track);
            }
        }
    }

    async fn on_readiness_changed(&mut self) {
        let ready = *self.readiness.borrow_and_update();
        info!("Signaling ready: {}", ready);

        if ready {
            self.reconcile().await;
        }
    }

    /// Pushes the new local tracks into every session and renegotiates.
    fn on_local_tracks_changed(&mut self) {
        let tracks = self.tracks.borrow_and_update().clone();

        let stale: Vec<ParticipantId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.media_generation != tracks.generation())
            .map(|(participant_id, _)| participant_id.clone())
            .collect();

        info!(
            "Local media changed (generation {}), updating {} sessions",
            tracks.generation(),
            stale.len()
        );

        for participant_id in stale {
            let Some(session) = self.sessions.get_mut(&participant_id) else {
                continue;
            };

            session.submit(SessionOp::ReplaceTracks(tracks.clone()));
            session.media_generation = tracks.generation();
            session.local_media_attached = !tracks.is_empty();

            // Before the first exchange completes there is nothing to
            // renegotiate yet; queue it behind that exchange.
            if session.negotiated {
                self.start_offer(&participant_id);
            } else {
                session.renegotiation_pending = true;
            }
        }
    }

    fn is_live(&self, tag: &SessionTag) -> bool {
        self.sessions
            .get(&tag.participant_id)
            .is_some_and(|session| session.tag.session_id == tag.session_id)
    }

    fn has_phase(&self, tag: &SessionTag, phase: SignalingPhase) -> bool {
        self.sessions
            .get(&tag.participant_id)
            .is_some_and(|session| session.phase == phase)
    }

    fn live_session(&mut self, tag: &SessionTag) -> Option<&mut PeerSession> {
        self.sessions
            .get_mut(&tag.participant_id)
            .filter(|session| session.tag.session_id == tag.session_id)
    }

    fn dispose(&mut self, participant_id: &ParticipantId, reason: &str) {
        let Some(session) = self.sessions.remove(participant_id) else {
            return;
        };

        self.remote_streams.remove(participant_id);
        info!("Disposing session {} ({})", session.tag, reason);
        session.dispose();
    }

    fn dispose_all(&mut self, reason: &str) {
        let participant_ids: Vec<ParticipantId> = self.sessions.keys().cloned().collect();
        for participant_id in participant_ids {
            self.dispose(&participant_id, reason);
        }
    }

    fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            ready: *self.readiness.borrow(),
            nearby: self.nearby.clone(),
            sessions: self
                .sessions
                .iter()
                .map(|(participant_id, session)| {
                    (
                        participant_id.clone(),
                        SessionSummary {
                            session_id: session.tag.session_id,
                            state: session.state,
                            initiator: session.initiator,
                            local_media_attached: session.local_media_attached,
                            has_remote_stream: self.remote_streams.contains(participant_id),
                        },
                    )
                })
                .collect(),
            participants: self.participants.len(),
        }
    }
}
