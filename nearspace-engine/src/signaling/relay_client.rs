use crate::config::EngineConfig;
use crate::error::SignalingError;
use crate::signaling::{RelayEvent, SignalingOutput};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nearspace_core::{
    IceCandidate, MediaFlags, ParticipantId, Position, PositionUpdate, SessionDescription,
    SignalMessage,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct RelayInner {
    space_id: String,
    outbound: mpsc::UnboundedSender<Message>,
    ready: Arc<watch::Sender<bool>>,
    position: watch::Sender<Position>,
    media: watch::Sender<MediaFlags>,
}

/// WebSocket connection to the signaling relay.
///
/// The client announces itself with `join` on every connection and is ready
/// once the relay answers with `welcome`. Lost connections are re-established
/// with exponential backoff; readiness drops to `false` in between.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<RelayInner>,
}

impl RelayClient {
    /// Opens the first connection. Fails if the relay cannot be reached at
    /// all; later disconnects are retried in the background.
    pub async fn connect(
        config: &EngineConfig,
        spawn_at: Position,
    ) -> Result<(Self, mpsc::Receiver<RelayEvent>), SignalingError> {
        info!("Connecting to relay {}", config.relay_url);

        let (socket, _) = connect_async(config.relay_url.as_str())
            .await
            .map_err(|e| SignalingError::Connect(e.to_string()))?;

        let (outbound, outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::channel(256);
        let (ready, _) = watch::channel(false);
        let ready = Arc::new(ready);
        let (position, position_rx) = watch::channel(spawn_at);
        let (media, media_rx) = watch::channel(MediaFlags::default());

        let connection = RelayConnection {
            relay_url: config.relay_url.clone(),
            space_id: config.space_id.clone(),
            participant_id: config.self_id.clone(),
            display_name: config.display_name.clone(),
            reconnect_attempts: config.relay_reconnect_attempts,
            reconnect_delay: config.reconnect_delay(),
            ready: ready.clone(),
            position: position_rx,
            media: media_rx,
            outbound_rx,
            event_tx,
        };
        tokio::spawn(connection.run(socket));

        let client = Self {
            inner: Arc::new(RelayInner {
                space_id: config.space_id.clone(),
                outbound,
                ready,
                position,
                media,
            }),
        };

        Ok((client, event_rx))
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    pub fn publish_move(&self, self_id: &ParticipantId, update: PositionUpdate) -> Result<(), SignalingError> {
        self.inner
            .position
            .send_replace(Position::new(update.x, update.y));
        self.send_frame(
            self_id,
            &SignalMessage::PlayerMove {
                space_id: self.inner.space_id.clone(),
                update,
            },
        )
    }

    pub fn publish_media(&self, self_id: &ParticipantId, flags: MediaFlags) -> Result<(), SignalingError> {
        self.inner.media.send_replace(flags);
        self.send_frame(
            self_id,
            &SignalMessage::MediaToggle {
                space_id: self.inner.space_id.clone(),
                flags,
            },
        )
    }

    fn send_session(&self, target: ParticipantId, msg: SignalMessage) -> Result<(), SignalingError> {
        if !self.is_ready() {
            return Err(SignalingError::NotReady);
        }
        self.send_frame(&target, &msg)
    }

    fn send_frame(&self, peer: &ParticipantId, msg: &SignalMessage) -> Result<(), SignalingError> {
        let json = serde_json::to_string(msg).map_err(|e| {
            error!("Failed to serialize signal message: {}", e);
            SignalingError::Encode(peer.clone(), e)
        })?;
        self.inner
            .outbound
            .send(Message::Text(json.into()))
            .map_err(|_| SignalingError::ChannelClosed)
    }
}

#[async_trait]
impl SignalingOutput for RelayClient {
    fn readiness(&self) -> watch::Receiver<bool> {
        self.inner.ready.subscribe()
    }

    async fn send_offer(&self, target: ParticipantId, sdp: String) -> Result<(), SignalingError> {
        debug!("Sending offer to {}", target);
        let msg = SignalMessage::SessionOffer {
            space_id: self.inner.space_id.clone(),
            target_participant_id: target.clone(),
            from_participant_id: None,
            offer: SessionDescription::offer(sdp),
        };
        self.send_session(target, msg)
    }

    async fn send_answer(&self, target: ParticipantId, sdp: String) -> Result<(), SignalingError> {
        debug!("Sending answer to {}", target);
        let msg = SignalMessage::SessionAnswer {
            space_id: self.inner.space_id.clone(),
            target_participant_id: target.clone(),
            from_participant_id: None,
            answer: SessionDescription::answer(sdp),
        };
        self.send_session(target, msg)
    }

    async fn send_candidate(
        &self,
        target: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        let msg = SignalMessage::ConnectivityCandidate {
            space_id: self.inner.space_id.clone(),
            target_participant_id: target.clone(),
            from_participant_id: None,
            candidate,
        };
        self.send_session(target, msg)
    }
}

enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

/// Background side of [`RelayClient`]: owns the socket and reconnects.
struct RelayConnection {
    relay_url: String,
    space_id: String,
    participant_id: ParticipantId,
    display_name: String,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
    ready: Arc<watch::Sender<bool>>,
    position: watch::Receiver<Position>,
    media: watch::Receiver<MediaFlags>,
    outbound_rx: mpsc::UnboundedReceiver<Message>,
    event_tx: mpsc::Sender<RelayEvent>,
}

impl RelayConnection {
    async fn run(mut self, first: RelaySocket) {
        let mut socket = Some(first);
        let mut delay = self.reconnect_delay;
        let mut failures = 0;

        loop {
            let ws = match socket.take() {
                Some(ws) => ws,
                None => match connect_async(self.relay_url.as_str()).await {
                    Ok((ws, _)) => {
                        info!("Reconnected to relay {}", self.relay_url);
                        ws
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(
                            "Relay reconnect {}/{} failed: {}",
                            failures, self.reconnect_attempts, e
                        );
                        if failures >= self.reconnect_attempts {
                            error!("Giving up on relay {}", self.relay_url);
                            return;
                        }
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                        continue;
                    }
                },
            };

            failures = 0;
            delay = self.reconnect_delay;

            match self.session(ws).await {
                SessionEnd::Shutdown => {
                    debug!("Relay client dropped, closing connection");
                    self.ready.send_replace(false);
                    return;
                }
                SessionEnd::Disconnected(reason) => {
                    self.ready.send_replace(false);
                    warn!("Relay connection closed: {}", reason);
                    if self.event_tx.send(RelayEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
            }

            tokio::time::sleep(delay).await;
        }
    }

    /// Runs one connection: `join`, then forward frames both ways until
    /// either side goes away.
    async fn session(&mut self, ws: RelaySocket) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        let position = *self.position.borrow();
        let join = SignalMessage::Join {
            space_id: self.space_id.clone(),
            participant_id: self.participant_id.clone(),
            display_name: self.display_name.clone(),
            x: position.x,
            y: position.y,
        };
        let mut greeting = vec![join];

        // A rejoin starts with default media flags on the relay side.
        let flags = *self.media.borrow();
        if flags != MediaFlags::default() {
            greeting.push(SignalMessage::MediaToggle {
                space_id: self.space_id.clone(),
                flags,
            });
        }

        for msg in &greeting {
            let json = match serde_json::to_string(msg) {
                Ok(json) => json,
                Err(e) => return SessionEnd::Disconnected(format!("failed to encode frame: {}", e)),
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                return SessionEnd::Disconnected("failed to send join".into());
            }
        }

        loop {
            tokio::select! {
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(msg) => {
                        if let Err(e) = sink.send(msg).await {
                            return SessionEnd::Disconnected(e.to_string());
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                },

                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !self.on_frame(text.as_str()).await {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Disconnected("closed by relay".into());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Disconnected(e.to_string()),
                },
            }
        }
    }

    /// Returns `false` once nobody listens for relay events anymore.
    async fn on_frame(&self, text: &str) -> bool {
        let signal = match serde_json::from_str::<SignalMessage>(text) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Invalid relay frame: {:?}", e);
                return true;
            }
        };
        let Some(event) = RelayEvent::translate(signal) else {
            return true;
        };

        if let RelayEvent::Ready { connection_id } = &event {
            info!("Relay handshake complete: {}", connection_id);
            self.ready.send_replace(true);
        }
        self.event_tx.send(event).await.is_ok()
    }
}
