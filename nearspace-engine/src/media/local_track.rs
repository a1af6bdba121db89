use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use anyhow::Result;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn codec_type(&self) -> RTPCodecType {
        match self {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        }
    }

    pub fn from_codec_type(codec_type: RTPCodecType) -> Option<Self> {
        match codec_type {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSource {
    Camera,
    Microphone,
    Screen,
}

impl MediaSource {
    pub fn kind(&self) -> TrackKind {
        match self {
            MediaSource::Microphone => TrackKind::Audio,
            MediaSource::Camera | MediaSource::Screen => TrackKind::Video,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaSource::Camera => "camera",
            MediaSource::Microphone => "microphone",
            MediaSource::Screen => "screen",
        }
    }
}

/// One outgoing track. Clones share the underlying track and its
/// `enabled` flag, so muting is visible to every session using it.
#[derive(Clone)]
pub struct LocalTrack {
    source: MediaSource,
    track: Arc<TrackLocalStaticSample>,
    enabled: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn for_source(source: MediaSource, stream_id: &str) -> Self {
        let codec = match source.kind() {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
        };

        let track = Arc::new(TrackLocalStaticSample::new(
            codec,
            format!("{}-{}", source.label(), stream_id),
            stream_id.to_owned(),
        ));

        Self {
            source,
            track,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn source(&self) -> MediaSource {
        self.source
    }

    pub fn kind(&self) -> TrackKind {
        self.source.kind()
    }

    pub fn id(&self) -> &str {
        self.track.id()
    }

    /// Track handle for the peer transport. Capture code writes through
    /// [`write_sample`](Self::write_sample) instead.
    pub(crate) fn track(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }

    /// Forwards one captured sample to every connection carrying this track.
    /// While the track is muted the sample is dropped and `false` is returned.
    pub async fn write_sample(&self, sample: &Sample) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        self.track.write_sample(sample).await?;
        Ok(true)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("source", &self.source)
            .field("id", &self.id())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Outgoing tracks currently published, at most one per kind.
///
/// `generation` grows with every publish so sessions can tell whether the
/// tracks they carry are current.
#[derive(Debug, Clone, Default)]
pub struct LocalTrackSet {
    audio: Option<LocalTrack>,
    video: Option<LocalTrack>,
    generation: u64,
}

impl LocalTrackSet {
    pub fn new(audio: Option<LocalTrack>, video: Option<LocalTrack>, generation: u64) -> Self {
        Self {
            audio,
            video,
            generation,
        }
    }

    pub fn audio(&self) -> Option<&LocalTrack> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&LocalTrack> {
        self.video.as_ref()
    }

    pub fn track(&self, kind: TrackKind) -> Option<&LocalTrack> {
        match kind {
            TrackKind::Audio => self.audio(),
            TrackKind::Video => self.video(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalTrack> {
        self.audio.iter().chain(self.video.iter())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}
