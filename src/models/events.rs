use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RosterUser;

/// Events received from a client over the WebSocket.
///
/// Kebab-case event names on the wire, camelCase payload fields. `drawing`
/// data is an opaque relay payload and is not validated beyond shape.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    SetUsername {
        username: String,
        avatar: String,
    },
    CreateRoom {
        username: String,
        avatar: String,
    },
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        username: String,
        avatar: String,
    },
    #[serde(rename_all = "camelCase")]
    Drawing {
        room_id: String,
        data: Value,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        room_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    LeaveRoom {
        #[serde(default)]
        room_id: Option<String>,
    },
}

/// Events sent to one or more clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Reply to `create-room`.
    #[serde(rename_all = "camelCase")]
    RoomCreated { success: bool, room_id: String },
    /// Reply to a `create-room` that could not allocate a room id.
    CreateRoomError { error: String },
    /// Reply to a successful `join-room`.
    RoomJoined { success: bool },
    /// Reply to a `join-room` against an unknown room.
    JoinRoomError { error: String },
    /// Full recomputed roster, sent to a room on every membership change.
    UserList { users: Vec<RosterUser> },
    /// Relayed stroke, sent to the room excluding the sender.
    Drawing { data: Value },
    /// Chat message with resolved sender identity and server timestamp,
    /// sent to the entire room including the sender.
    ChatMessage {
        sender: String,
        avatar: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_kebab_case_tags_and_camel_case_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{ "type": "join-room", "roomId": "abc123", "username": "ada", "avatar": "a.png" }"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::JoinRoom { .. }));

        // leave-room tolerates a missing roomId
        let event: ClientEvent = serde_json::from_str(r#"{ "type": "leave-room" }"#).unwrap();
        assert!(matches!(event, ClientEvent::LeaveRoom { room_id: None }));
    }

    #[test]
    fn server_events_serialize_with_wire_names() {
        let reply = ServerEvent::RoomCreated {
            success: true,
            room_id: "abc123".to_string(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&reply).unwrap()).unwrap();
        assert_eq!(json["type"], "room-created");
        assert_eq!(json["roomId"], "abc123");

        let roster = ServerEvent::UserList {
            users: vec![RosterUser {
                username: "ada".to_string(),
                avatar: "a.png".to_string(),
            }],
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&roster).unwrap()).unwrap();
        assert_eq!(json["type"], "user-list");
        assert_eq!(json["users"][0]["username"], "ada");
    }
}
