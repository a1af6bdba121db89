use nearspace_core::{MediaFlags, Participant, ParticipantId, PositionUpdate};
use std::collections::HashMap;

/// Remote participants of the current space, keyed by id. Entries for the
/// local participant are never stored.
#[derive(Debug, Clone)]
pub struct ParticipantStore {
    self_id: ParticipantId,
    participants: HashMap<ParticipantId, Participant>,
}

impl ParticipantStore {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            self_id,
            participants: HashMap::new(),
        }
    }

    pub fn replace_all(&mut self, players: Vec<Participant>) {
        self.participants = players
            .into_iter()
            .filter(|p| p.participant_id != self.self_id)
            .map(|p| (p.participant_id.clone(), p))
            .collect();
    }

    /// A participant that joins twice (reload) replaces its stale entry.
    pub fn upsert(&mut self, participant: Participant) -> bool {
        if participant.participant_id == self.self_id {
            return false;
        }
        self.participants
            .insert(participant.participant_id.clone(), participant);
        true
    }

    pub fn apply_move(&mut self, participant_id: &ParticipantId, update: &PositionUpdate) -> bool {
        match self.participants.get_mut(participant_id) {
            Some(p) => {
                p.apply_update(update);
                true
            }
            None => false,
        }
    }

    pub fn set_media(&mut self, participant_id: &ParticipantId, flags: MediaFlags) -> bool {
        match self.participants.get_mut(participant_id) {
            Some(p) => {
                p.media = flags;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, participant_id: &ParticipantId) -> Option<Participant> {
        self.participants.remove(participant_id)
    }

    pub fn get(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(participant_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
