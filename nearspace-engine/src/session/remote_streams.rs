use crate::transport::{RemoteMediaTrack, SessionTag};
use dashmap::DashMap;
use nearspace_core::{ParticipantId, SessionId};
use std::fmt;
use std::sync::Arc;

/// Media received from one remote participant over its current session.
#[derive(Clone)]
pub struct RemoteStream {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub tracks: Vec<Arc<dyn RemoteMediaTrack>>,
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.tracks.iter().map(|t| t.track_id()).collect();
        f.debug_struct("RemoteStream")
            .field("participant_id", &self.participant_id)
            .field("session_id", &self.session_id)
            .field("tracks", &ids)
            .finish()
    }
}

/// Remote streams by participant, readable from rendering code while the
/// orchestrator updates it.
#[derive(Clone, Default)]
pub struct RemoteStreams {
    streams: Arc<DashMap<ParticipantId, RemoteStream>>,
}

impl RemoteStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track to the stream of `tag`'s participant. A stream from an
    /// older session of the same participant is replaced.
    pub(crate) fn add_track(&self, tag: &SessionTag, track: Arc<dyn RemoteMediaTrack>) {
        let mut entry = self
            .streams
            .entry(tag.participant_id.clone())
            .or_insert_with(|| RemoteStream {
                participant_id: tag.participant_id.clone(),
                session_id: tag.session_id,
                tracks: Vec::new(),
            });

        if entry.session_id != tag.session_id {
            entry.session_id = tag.session_id;
            entry.tracks.clear();
        }

        let track_id = track.track_id();
        entry.tracks.retain(|t| t.track_id() != track_id);
        entry.tracks.push(track);
    }

    pub(crate) fn remove(&self, participant_id: &ParticipantId) -> Option<RemoteStream> {
        self.streams.remove(participant_id).map(|(_, stream)| stream)
    }

    pub fn get(&self, participant_id: &ParticipantId) -> Option<RemoteStream> {
        self.streams.get(participant_id).map(|s| s.clone())
    }

    pub fn contains(&self, participant_id: &ParticipantId) -> bool {
        self.streams.contains_key(participant_id)
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.streams.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
