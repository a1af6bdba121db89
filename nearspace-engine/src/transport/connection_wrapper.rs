use crate::media::{LocalTrackSet, TrackKind};
use crate::transport::{
    ConnectionState, PeerTransport, RemoteMediaTrack, SessionTag, TransportConfig,
    TransportEvent, TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use nearspace_core::IceCandidate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

const TRACK_KINDS: [TrackKind; 2] = [TrackKind::Audio, TrackKind::Video];

/// webrtc-backed [`PeerTransport`].
pub struct ConnectionWrapper {
    pub tag: SessionTag,
    pub peer_connection: Arc<RTCPeerConnection>,
    senders: Mutex<HashMap<TrackKind, Arc<RTCRtpSender>>>,
}

impl ConnectionWrapper {
    /// Creates the peer connection and attaches `tracks`. Kinds without a
    /// local track get a receive-only transceiver so remote media still
    /// arrives. Events are reported on `event_tx` tagged with `tag`.
    pub async fn new(
        tag: SessionTag,
        config: TransportConfig,
        tracks: &LocalTrackSet,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let tag_state = tag.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let tag = tag_state.clone();

                Box::pin(async move {
                    info!("Peer connection state changed for {}: {:?}", tag, s);
                    let state = match s {
                        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => ConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => ConnectionState::Failed,
                        RTCPeerConnectionState::Closed => ConnectionState::Closed,
                        _ => ConnectionState::New,
                    };
                    let _ = tx.send(TransportEvent::StateChanged(tag, state)).await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let tag_ice = tag.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let tag = tag_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(tag, candidate))
                    .await;
            })
        }));

        let track_tx = event_tx.clone();
        let tag_track = tag.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let tag = tag_track.clone();

                Box::pin(async move {
                    debug!("Remote track {:?} arrived for {}", track.id(), tag);
                    let remote: Arc<dyn RemoteMediaTrack> = Arc::new(WebRtcRemoteTrack { track });
                    let _ = tx.send(TransportEvent::RemoteTrack(tag, remote)).await;
                })
            },
        ));

        let mut senders = HashMap::new();
        for kind in TRACK_KINDS {
            match tracks.track(kind) {
                Some(local) => {
                    let sender = peer_connection
                        .add_track(local.track() as Arc<dyn TrackLocal + Send + Sync>)
                        .await
                        .with_context(|| format!("Failed to add {:?} track", kind))?;
                    senders.insert(kind, sender);
                }
                None => {
                    peer_connection
                        .add_transceiver_from_kind(
                            kind.codec_type(),
                            Some(RTCRtpTransceiverInit {
                                direction: RTCRtpTransceiverDirection::Recvonly,
                                send_encodings: vec![],
                            }),
                        )
                        .await
                        .with_context(|| format!("Failed to add {:?} transceiver", kind))?;
                }
            }
        }

        Ok(Self {
            tag,
            peer_connection,
            senders: Mutex::new(senders),
        })
    }
}

#[async_trait]
impl PeerTransport for ConnectionWrapper {
    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn accept_offer(&self, sdp: String) -> Result<String> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to apply remote offer")?;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn apply_answer(&self, sdp: String) -> Result<bool> {
        if self.peer_connection.signaling_state() == RTCSignalingState::Stable {
            return Ok(false);
        }

        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to apply remote answer")?;
        Ok(true)
    }

    async fn rollback(&self) -> Result<()> {
        if self.peer_connection.signaling_state() != RTCSignalingState::HaveLocalOffer {
            return Ok(());
        }
        let Some(mut desc) = self.peer_connection.pending_local_description().await else {
            return Ok(());
        };

        desc.sdp_type = RTCSdpType::Rollback;
        self.peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to roll back local offer")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn replace_tracks(&self, tracks: &LocalTrackSet) -> Result<()> {
        let mut senders = self.senders.lock().await;

        for kind in TRACK_KINDS {
            let next = tracks
                .track(kind)
                .map(|local| local.track() as Arc<dyn TrackLocal + Send + Sync>);

            if let Some(sender) = senders.get(&kind).cloned() {
                sender
                    .replace_track(next)
                    .await
                    .with_context(|| format!("Failed to replace {:?} track", kind))?;
                continue;
            }

            let Some(track) = next else { continue };
            let sender = self
                .peer_connection
                .add_track(track)
                .await
                .with_context(|| format!("Failed to add {:?} track", kind))?;
            senders.insert(kind, sender);
        }

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

struct WebRtcRemoteTrack {
    track: Arc<TrackRemote>,
}

#[async_trait]
impl RemoteMediaTrack for WebRtcRemoteTrack {
    fn track_id(&self) -> String {
        self.track.id()
    }

    fn stream_id(&self) -> String {
        self.track.stream_id()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::from_codec_type(self.track.kind()).unwrap_or(TrackKind::Video)
    }

    async fn read_packet(&self) -> Result<webrtc::rtp::packet::Packet> {
        let (packet, _) = self.track.read_rtp().await?;
        Ok(packet)
    }
}

/// Builds a [`ConnectionWrapper`] per session.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        tag: SessionTag,
        tracks: &LocalTrackSet,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport = ConnectionWrapper::new(tag, self.config.clone(), tracks, event_tx).await?;
        Ok(Arc::new(transport))
    }
}
