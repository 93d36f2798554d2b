use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for one live WebSocket connection, generated at accept time.
pub type ConnectionId = Uuid;

/// Generated 6-character room code.
pub type RoomId = String;

/// Identity of one live connection. At most one per connection id; the room
/// binding is cleared on leave and the whole record deleted on disconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub username: String,
    pub avatar: String,
    pub room: Option<RoomId>,
}

/// One entry of the identity-resolved roster sent in `user-list` events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RosterUser {
    pub username: String,
    pub avatar: String,
}
