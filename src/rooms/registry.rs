use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::models::{ConnectionId, RoomId, Session};

/// Maps each live connection to its session identity.
///
/// Not internally locked: the event router owns an instance behind its core
/// lock and serializes all access (see `rooms::router`).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update the session for a connection. Idempotent; a repeated
    /// call updates the identity in place and preserves the room binding.
    pub fn set_identity(&mut self, conn: ConnectionId, username: &str, avatar: &str) {
        match self.sessions.entry(conn) {
            Entry::Occupied(mut occupied) => {
                let session = occupied.get_mut();
                session.username = username.to_string();
                session.avatar = avatar.to_string();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Session {
                    username: username.to_string(),
                    avatar: avatar.to_string(),
                    room: None,
                });
            }
        }
    }

    /// Bind the connection's session to a room. No-op if the session is absent.
    pub fn bind_room(&mut self, conn: ConnectionId, room_id: &str) {
        if let Some(session) = self.sessions.get_mut(&conn) {
            session.room = Some(RoomId::from(room_id));
        }
    }

    /// Clear the room binding, retaining the identity.
    pub fn clear_room(&mut self, conn: ConnectionId) {
        if let Some(session) = self.sessions.get_mut(&conn) {
            session.room = None;
        }
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&Session> {
        self.sessions.get(&conn)
    }

    /// Delete the session. Idempotent; returns the removed session if any.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Session> {
        self.sessions.remove(&conn)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
