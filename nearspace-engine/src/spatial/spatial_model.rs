use nearspace_core::{Bounds, Direction, PositionUpdate, Room, RoomId, Side};
use serde::{Deserialize, Serialize};

/// Rooms of one space, in declaration order.
///
/// Room bounds are expected not to overlap. When they do, the room declared
/// first wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialModel {
    rooms: Vec<Room>,
}

impl SpatialModel {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| &room.room_id == room_id)
    }

    pub fn room_at(&self, x: f64, y: f64) -> Option<RoomId> {
        self.rooms
            .iter()
            .find(|room| room.bounds.contains(x, y))
            .map(|room| room.room_id.clone())
    }

    /// Builds the update the map reports for an avatar standing at `(x, y)`.
    pub fn locate(&self, x: f64, y: f64, direction: Direction, is_walking: bool) -> PositionUpdate {
        PositionUpdate {
            x,
            y,
            direction,
            is_walking,
            room_id: self.room_at(x, y),
        }
    }

    /// The office map the product ships with.
    pub fn reference_layout() -> Self {
        let mut rooms = vec![
            Room::new("reception", "Reception", Bounds::new(800.0, 600.0, 400.0, 300.0))
                .with_entrance(Side::Top, 160.0, 80.0)
                .with_entrance(Side::Bottom, 160.0, 80.0),
            Room::new("parking", "Parking Lot", Bounds::new(700.0, 1000.0, 600.0, 300.0))
                .with_entrance(Side::Top, 260.0, 80.0),
            Room::new("admin", "Admin Office", Bounds::new(1300.0, 100.0, 300.0, 250.0))
                .with_entrance(Side::Bottom, 110.0, 80.0),
            Room::new("meeting", "Meeting Room", Bounds::new(750.0, 100.0, 450.0, 400.0))
                .with_entrance(Side::Bottom, 185.0, 80.0),
            Room::new("garden", "Garden", Bounds::new(1300.0, 400.0, 450.0, 300.0))
                .with_entrance(Side::Left, 110.0, 80.0),
        ];

        // 3x4 grid of staff rooms on the left side.
        for i in 0..12 {
            let row = (i / 3) as f64;
            let col = (i % 3) as f64;
            let x = 50.0 + col * (160.0 + 40.0);
            let y = 50.0 + row * (140.0 + 60.0);
            rooms.push(
                Room::new(
                    format!("staff-{}", i + 1),
                    format!("Staff {}", i + 1),
                    Bounds::new(x, y, 160.0, 140.0),
                )
                .with_entrance(Side::Bottom, 40.0, 80.0),
            );
        }

        Self::new(rooms)
    }
}
