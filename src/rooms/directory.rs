use std::collections::{HashMap, HashSet};

use crate::models::{ConnectionId, RoomError, RoomId};

/// Maps each room id to its member connection set.
///
/// Like the registry, this structure is owned by the event router behind its
/// core lock; removal races are tolerated as silent no-ops (the room may have
/// been concurrently deleted by another connection's final leave).
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty room. The allocator is expected to avoid collisions;
    /// `DuplicateRoom` here means a retry is needed.
    pub fn create(&mut self, room_id: &str) -> Result<(), RoomError> {
        if self.rooms.contains_key(room_id) {
            return Err(RoomError::DuplicateRoom);
        }
        self.rooms.insert(RoomId::from(room_id), HashSet::new());
        Ok(())
    }

    /// Add a member. Duplicate add is a no-op (set semantics).
    pub fn add_member(&mut self, room_id: &str, conn: ConnectionId) -> Result<(), RoomError> {
        match self.rooms.get_mut(room_id) {
            Some(members) => {
                members.insert(conn);
                Ok(())
            }
            None => Err(RoomError::RoomNotFound),
        }
    }

    /// Remove a member. Returns whether a membership was actually removed;
    /// an absent room or membership is not an error. A room left empty is
    /// garbage-collected immediately.
    pub fn remove_member(&mut self, room_id: &str, conn: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(&conn);
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Current member set of a room; empty (not an error) if the room is absent.
    pub fn members_of(&self, room_id: &str) -> HashSet<ConnectionId> {
        self.rooms.get(room_id).cloned().unwrap_or_default()
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn duplicate_create_is_rejected() {
        let mut directory = RoomDirectory::new();
        assert!(directory.create("abc123").is_ok());
        assert_eq!(directory.create("abc123"), Err(RoomError::DuplicateRoom));
    }

    #[test]
    fn add_member_has_set_semantics() {
        let mut directory = RoomDirectory::new();
        let conn = Uuid::new_v4();

        directory.create("abc123").unwrap();
        directory.add_member("abc123", conn).unwrap();
        directory.add_member("abc123", conn).unwrap();
        assert_eq!(directory.members_of("abc123").len(), 1);
    }

    #[test]
    fn add_member_to_unknown_room_fails() {
        let mut directory = RoomDirectory::new();
        assert_eq!(
            directory.add_member("zzzzzz", Uuid::new_v4()),
            Err(RoomError::RoomNotFound)
        );
    }

    #[test]
    fn remove_member_tolerates_absent_room_and_membership() {
        let mut directory = RoomDirectory::new();
        let conn = Uuid::new_v4();

        assert!(!directory.remove_member("zzzzzz", conn));

        directory.create("abc123").unwrap();
        directory.add_member("abc123", conn).unwrap();
        assert!(directory.remove_member("abc123", conn));
        assert!(!directory.remove_member("abc123", conn));
    }

    #[test]
    fn empty_room_is_garbage_collected() {
        let mut directory = RoomDirectory::new();
        let conn = Uuid::new_v4();

        directory.create("abc123").unwrap();
        directory.add_member("abc123", conn).unwrap();
        directory.remove_member("abc123", conn);
        assert!(!directory.contains("abc123"));
        assert!(directory.members_of("abc123").is_empty());
    }
}
