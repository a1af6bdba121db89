use nearspace_core::{Bounds, Participant, Position, RoomId};

/// What the local participant is allowed to see and hear.
///
/// Inside a room the observer perceives exactly that room. In open space the
/// observer perceives a circle around itself, but never into any room.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    Room { room_id: RoomId, bounds: Option<Bounds> },
    Radius { center: Position, radius: f64 },
}

impl Visibility {
    /// `bounds` is only used by renderers to clip the overlay and may be
    /// unknown when the room is missing from the local layout.
    pub fn for_observer(observer: &Participant, radius: f64, bounds: Option<Bounds>) -> Self {
        match &observer.room_id {
            Some(room_id) => Visibility::Room {
                room_id: room_id.clone(),
                bounds,
            },
            None => Visibility::Radius {
                center: observer.position,
                radius,
            },
        }
    }

    pub fn reveals(&self, other: &Participant) -> bool {
        match self {
            Visibility::Room { room_id, .. } => other.room_id.as_ref() == Some(room_id),
            Visibility::Radius { center, radius } => {
                other.room_id.is_none() && center.distance_to(&other.position) <= *radius
            }
        }
    }
}
