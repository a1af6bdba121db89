use crate::error::MediaError;
use crate::media::{LocalTrack, LocalTrackSet, MediaSource};
use async_trait::async_trait;
use nearspace_core::MediaFlags;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Capture backend: cameras, microphones and screen capture.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, source: MediaSource) -> Result<LocalTrack, MediaError>;

    /// Called when a track is no longer published.
    async fn release(&self, _track: &LocalTrack) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStreamMode {
    Screen,
    Video,
    Audio,
    None,
}

impl MediaStreamMode {
    pub fn resolve(screen_sharing: bool, flags: MediaFlags) -> Self {
        if screen_sharing {
            MediaStreamMode::Screen
        } else if flags.video {
            MediaStreamMode::Video
        } else if flags.audio {
            MediaStreamMode::Audio
        } else {
            MediaStreamMode::None
        }
    }
}

/// Owns the local capture state and publishes the outgoing track set.
///
/// Toggles return the flags to broadcast to other participants. A device
/// that cannot be acquired turns its capability back off.
pub struct MediaSourceManager {
    devices: Arc<dyn MediaDevices>,
    flags: MediaFlags,
    screen_sharing: bool,
    mode: MediaStreamMode,
    tracks: LocalTrackSet,
    publisher: watch::Sender<LocalTrackSet>,
}

impl MediaSourceManager {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        let (publisher, _) = watch::channel(LocalTrackSet::default());

        Self {
            devices,
            flags: MediaFlags::default(),
            screen_sharing: false,
            mode: MediaStreamMode::None,
            tracks: LocalTrackSet::default(),
            publisher,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LocalTrackSet> {
        self.publisher.subscribe()
    }

    pub fn flags(&self) -> MediaFlags {
        self.flags
    }

    pub fn mode(&self) -> MediaStreamMode {
        self.mode
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen_sharing
    }

    pub fn tracks(&self) -> &LocalTrackSet {
        &self.tracks
    }

    pub async fn toggle_video(&mut self) -> MediaFlags {
        self.flags.video = !self.flags.video;
        self.screen_sharing = false;
        self.apply().await;
        self.flags
    }

    pub async fn toggle_audio(&mut self) -> MediaFlags {
        self.flags.audio = !self.flags.audio;
        self.apply().await;
        self.flags
    }

    pub async fn toggle_screen_share(&mut self) -> MediaFlags {
        self.screen_sharing = !self.screen_sharing;
        self.flags.video = self.screen_sharing;
        self.apply().await;
        self.flags
    }

    /// The capture source ended on its own (e.g. the user stopped sharing
    /// from the system UI).
    pub async fn screen_share_ended(&mut self) -> MediaFlags {
        if self.screen_sharing {
            return self.toggle_screen_share().await;
        }
        self.flags
    }

    async fn apply(&mut self) {
        let mut mode = MediaStreamMode::resolve(self.screen_sharing, self.flags);

        if mode == self.mode {
            if let Some(mic) = self.tracks.audio() {
                mic.set_enabled(self.flags.audio);
                debug!("Microphone enabled = {}", self.flags.audio);
            }
            return;
        }

        info!("Switching media mode {:?} -> {:?}", self.mode, mode);

        for track in self.tracks.iter() {
            self.devices.release(track).await;
        }

        // Every failed acquisition switches a capability off, so this ends
        // at the latest in `None`.
        let (audio, video) = loop {
            match self.acquire_for(mode).await {
                Some(tracks) => break tracks,
                None => mode = MediaStreamMode::resolve(self.screen_sharing, self.flags),
            }
        };

        self.mode = mode;
        self.publish(audio, video);
    }

    async fn acquire_for(
        &mut self,
        mode: MediaStreamMode,
    ) -> Option<(Option<LocalTrack>, Option<LocalTrack>)> {
        match mode {
            MediaStreamMode::None => Some((None, None)),

            MediaStreamMode::Audio => match self.devices.acquire(MediaSource::Microphone).await {
                Ok(mic) => Some((Some(mic), None)),
                Err(e) => {
                    warn!("Microphone unavailable: {}", e);
                    self.flags.audio = false;
                    None
                }
            },

            MediaStreamMode::Video | MediaStreamMode::Screen => {
                let source = if mode == MediaStreamMode::Screen {
                    MediaSource::Screen
                } else {
                    MediaSource::Camera
                };

                let video = match self.devices.acquire(source).await {
                    Ok(track) => track,
                    Err(e) => {
                        warn!("{} unavailable: {}", source.label(), e);
                        self.flags.video = false;
                        self.screen_sharing = false;
                        return None;
                    }
                };

                // Video modes always carry the microphone when there is one;
                // mute is expressed through the track's enabled flag.
                let audio = match self.devices.acquire(MediaSource::Microphone).await {
                    Ok(mic) => {
                        mic.set_enabled(self.flags.audio);
                        Some(mic)
                    }
                    Err(e) => {
                        warn!("Continuing with {} only: {}", source.label(), e);
                        None
                    }
                };

                Some((audio, Some(video)))
            }
        }
    }

    fn publish(&mut self, audio: Option<LocalTrack>, video: Option<LocalTrack>) {
        let generation = self.tracks.generation() + 1;
        self.tracks = LocalTrackSet::new(audio, video, generation);
        self.publisher.send_replace(self.tracks.clone());
        debug!("Published local track set generation {}", generation);
    }
}
