mod participant;
mod room;
mod session;
mod signaling;

pub use participant::{Direction, MediaFlags, Participant, ParticipantId, Position, PositionUpdate};
pub use room::{Bounds, Entrance, Room, RoomId, Side};
pub use session::SessionId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalMessage};
