use crate::proximity::Visibility;
use nearspace_core::{Participant, ParticipantId};
use std::collections::BTreeSet;

/// Radius shared by the visibility overlay and the proximity rule.
pub const DEFAULT_PROXIMITY_RADIUS: f64 = 150.0;

pub type NearbySet = BTreeSet<ParticipantId>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityEngine {
    radius: f64,
}

impl Default for ProximityEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_RADIUS)
    }
}

impl ProximityEngine {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn compute_nearby<'a>(
        &self,
        observer: &Participant,
        others: impl IntoIterator<Item = &'a Participant>,
    ) -> NearbySet {
        let view = Visibility::for_observer(observer, self.radius, None);

        others
            .into_iter()
            .filter(|p| p.participant_id != observer.participant_id)
            .filter(|p| view.reveals(p))
            .map(|p| p.participant_id.clone())
            .collect()
    }

    pub fn is_nearby(&self, observer: &Participant, other: &Participant) -> bool {
        observer.participant_id != other.participant_id
            && Visibility::for_observer(observer, self.radius, None).reveals(other)
    }

    /// Gain for a remote participant's audio: 1 at the observer, falling
    /// linearly to 0 at the radius.
    pub fn volume_for(&self, observer: &Participant, other: &Participant) -> f64 {
        proximity_volume(observer.position.distance_to(&other.position), self.radius)
    }
}

pub fn proximity_volume(distance: f64, radius: f64) -> f64 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    1.0 - distance / radius
}

/// Difference between two consecutive nearby sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearbyDiff {
    pub entered: Vec<ParticipantId>,
    pub left: Vec<ParticipantId>,
    pub retained: Vec<ParticipantId>,
}

impl NearbyDiff {
    pub fn between(old: &NearbySet, new: &NearbySet) -> Self {
        Self {
            entered: new.difference(old).cloned().collect(),
            left: old.difference(new).cloned().collect(),
            retained: new.intersection(old).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}
