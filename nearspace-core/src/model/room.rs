use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle in map units.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edges are inside. Degenerate rectangles contain nothing.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

/// Gap in a room's wall. `offset` is measured from the left (top/bottom walls)
/// or top (left/right walls) corner of the room.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Entrance {
    pub side: Side,
    pub offset: f64,
    pub width: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(alias = "id")]
    pub room_id: RoomId,
    #[serde(default)]
    pub name: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub entrances: Vec<Entrance>,
}

impl Room {
    pub fn new(room_id: impl Into<String>, name: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            room_id: RoomId::new(room_id),
            name: name.into(),
            bounds,
            entrances: Vec::new(),
        }
    }

    pub fn with_entrance(mut self, side: Side, offset: f64, width: f64) -> Self {
        self.entrances.push(Entrance {
            side,
            offset,
            width,
        });
        self
    }
}
