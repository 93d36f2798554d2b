use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::models::{ClientEvent, ConnectionId, RoomId, RosterUser, ServerEvent};
use crate::rooms::allocator;
use crate::rooms::directory::RoomDirectory;
use crate::rooms::fanout::Broadcaster;
use crate::rooms::registry::ConnectionRegistry;

/// Registry and directory live together behind one coarse lock so the
/// compound create/join transitions mutate both as a single atomic unit.
/// At the target scale (tens of rooms, hundreds of members) contention on a
/// single lock is a non-issue.
#[derive(Default)]
struct CoreState {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
}

/// Membership snapshot taken under the core lock, consumed for fanout after
/// the lock is released.
struct RoomUpdate {
    room_id: RoomId,
    members: HashSet<ConnectionId>,
    roster: Vec<RosterUser>,
}

/// The event-dispatch state machine: validates inbound events, mutates the
/// registry and directory, and hands the resulting broadcast set to the
/// fanout broadcaster.
///
/// Cheap to clone; clones share the same core state, pending-removal task
/// registry and broadcaster.
#[derive(Clone)]
pub struct EventRouter {
    core: Arc<Mutex<CoreState>>,
    pending_removals: Arc<DashMap<ConnectionId, JoinHandle<()>>>,
    broadcaster: Broadcaster,
    grace: Duration,
}

impl EventRouter {
    pub fn new(broadcaster: Broadcaster, grace: Duration) -> Self {
        Self {
            core: Arc::new(Mutex::new(CoreState::default())),
            pending_removals: Arc::new(DashMap::new()),
            broadcaster,
            grace,
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Dispatch one inbound event for a connection. Events from the same
    /// connection are expected to arrive in order; events from different
    /// connections are serialized by the core lock.
    pub fn handle_event(&self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::SetUsername { username, avatar } => {
                self.set_username(conn, &username, &avatar)
            }
            ClientEvent::CreateRoom { username, avatar } => {
                self.create_room(conn, &username, &avatar)
            }
            ClientEvent::JoinRoom {
                room_id,
                username,
                avatar,
            } => self.join_room(conn, &room_id, &username, &avatar),
            ClientEvent::Drawing { room_id, data } => self.relay_drawing(conn, &room_id, data),
            ClientEvent::ChatMessage { room_id, message } => {
                self.relay_chat(conn, &room_id, message)
            }
            ClientEvent::LeaveRoom { room_id } => self.leave_room(conn, room_id.as_deref()),
        }
    }

    fn set_username(&self, conn: ConnectionId, username: &str, avatar: &str) {
        let mut state = self.lock_core();
        state.registry.set_identity(conn, username, avatar);
        debug!("Username set for {}: {}", conn, username);
    }

    fn create_room(&self, conn: ConnectionId, username: &str, avatar: &str) {
        let mut prior = None;
        let created = {
            let mut state = self.lock_core();
            let CoreState {
                registry,
                directory,
            } = &mut *state;
            match allocator::allocate(directory) {
                Ok(room_id) => {
                    prior = detach_from_current_room(registry, directory, conn);
                    registry.set_identity(conn, username, avatar);
                    registry.bind_room(conn, &room_id);
                    match directory.add_member(&room_id, conn) {
                        Ok(()) => Some(room_snapshot(registry, directory, &room_id)),
                        Err(e) => {
                            // Unreachable while the lock is held across
                            // create and add; keep state consistent anyway.
                            error!("Membership add after create failed for {}: {}", room_id, e);
                            registry.clear_room(conn);
                            None
                        }
                    }
                }
                Err(e) => {
                    error!("Room allocation failed for connection {}: {}", conn, e);
                    None
                }
            }
        };

        match created {
            Some(update) => {
                info!("Room created: {} by connection {}", update.room_id, conn);
                self.broadcaster.unicast(
                    conn,
                    &ServerEvent::RoomCreated {
                        success: true,
                        room_id: update.room_id.clone(),
                    },
                );
                if let Some(prior) = prior {
                    self.broadcast_roster(&prior);
                }
                self.broadcast_roster(&update);
            }
            None => {
                self.broadcaster.unicast(
                    conn,
                    &ServerEvent::CreateRoomError {
                        error: "Failed to create room".to_string(),
                    },
                );
            }
        }
    }

    fn join_room(&self, conn: ConnectionId, room_id: &str, username: &str, avatar: &str) {
        let mut prior = None;
        let joined = {
            let mut state = self.lock_core();
            let CoreState {
                registry,
                directory,
            } = &mut *state;
            if !directory.contains(room_id) {
                None
            } else {
                let current = registry.get(conn).and_then(|s| s.room.clone());
                if current.as_deref() != Some(room_id) {
                    prior = detach_from_current_room(registry, directory, conn);
                }
                registry.set_identity(conn, username, avatar);
                registry.bind_room(conn, room_id);
                match directory.add_member(room_id, conn) {
                    Ok(()) => Some(room_snapshot(registry, directory, room_id)),
                    Err(e) => {
                        error!("Membership add failed for {}: {}", room_id, e);
                        registry.clear_room(conn);
                        None
                    }
                }
            }
        };

        match joined {
            Some(update) => {
                info!("{} joined room {}", username, update.room_id);
                self.broadcaster
                    .unicast(conn, &ServerEvent::RoomJoined { success: true });
                if let Some(prior) = prior {
                    self.broadcast_roster(&prior);
                }
                self.broadcast_roster(&update);
            }
            None => {
                debug!("Join against unknown room '{}' by {}", room_id, conn);
                self.broadcaster.unicast(
                    conn,
                    &ServerEvent::JoinRoomError {
                        error: "Room not found".to_string(),
                    },
                );
            }
        }
    }

    /// Stateless relay to the sender's bound room, excluding the sender.
    /// The claimed room id in the payload is clamped to the bound room.
    fn relay_drawing(&self, conn: ConnectionId, claimed_room: &str, data: Value) {
        let members = {
            let state = self.lock_core();
            let Some(room_id) = state.registry.get(conn).and_then(|s| s.room.clone()) else {
                debug!("Dropping stroke from connection {} not in a room", conn);
                return;
            };
            if room_id != claimed_room {
                debug!(
                    "Connection {} claims room '{}' but is in '{}'",
                    conn, claimed_room, room_id
                );
            }
            state.directory.members_of(&room_id)
        };
        self.broadcaster
            .broadcast(members, &ServerEvent::Drawing { data }, Some(conn));
    }

    /// Relay a chat message to the sender's bound room, sender included,
    /// stamped with the sender's identity and the server time.
    fn relay_chat(&self, conn: ConnectionId, claimed_room: &str, message: String) {
        let (members, event) = {
            let state = self.lock_core();
            let Some(session) = state.registry.get(conn) else {
                debug!("Dropping chat from unknown connection {}", conn);
                return;
            };
            let Some(room_id) = session.room.clone() else {
                debug!("Dropping chat from connection {} not in a room", conn);
                return;
            };
            if room_id != claimed_room {
                debug!(
                    "Connection {} claims room '{}' but is in '{}'",
                    conn, claimed_room, room_id
                );
            }
            let event = ServerEvent::ChatMessage {
                sender: session.username.clone(),
                avatar: session.avatar.clone(),
                message,
                timestamp: Utc::now(),
            };
            (state.directory.members_of(&room_id), event)
        };
        self.broadcaster.broadcast(members, &event, None);
    }

    fn leave_room(&self, conn: ConnectionId, requested: Option<&str>) {
        // An explicit leave supersedes a pending disconnect removal: the
        // transport is already gone, so finalize the whole session now.
        if let Some((_, handle)) = self.pending_removals.remove(&conn) {
            handle.abort();
            self.finalize_removal(conn);
            return;
        }

        let update = {
            let mut state = self.lock_core();
            let CoreState {
                registry,
                directory,
            } = &mut *state;
            let bound = registry.get(conn).and_then(|s| s.room.clone());
            let Some(room_id) = requested.map(RoomId::from).or_else(|| bound.clone()) else {
                // Not in a room and none named: silent no-op.
                return;
            };
            let removed = directory.remove_member(&room_id, conn);
            if bound.as_deref() == Some(room_id.as_str()) {
                registry.clear_room(conn);
            }
            if removed {
                Some(room_snapshot(registry, directory, &room_id))
            } else {
                None
            }
        };

        if let Some(update) = update {
            info!("Connection {} left room {}", conn, update.room_id);
            self.broadcast_roster(&update);
        }
    }

    /// Transport-level disconnect: the outbound channel is dropped right
    /// away, but session removal is deferred by the grace delay so a rapid
    /// page refresh does not flash a departure to peers. The scheduled task
    /// is keyed by connection id so a later event can supersede it.
    pub fn disconnect(&self, conn: ConnectionId) {
        self.broadcaster.unregister(conn);
        let router = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(router.grace).await;
            router.finalize_removal(conn);
        });
        if let Some(stale) = self.pending_removals.insert(conn, handle) {
            stale.abort();
        }
        debug!("Scheduled removal of connection {} in {:?}", conn, self.grace);
    }

    /// Deferred-removal body. Re-checks session existence at fire time: if an
    /// explicit leave already cleared the room binding or removed the session,
    /// this degrades to a no-op with no second broadcast.
    fn finalize_removal(&self, conn: ConnectionId) {
        self.pending_removals.remove(&conn);
        let update = {
            let mut state = self.lock_core();
            let CoreState {
                registry,
                directory,
            } = &mut *state;
            let Some(session) = registry.remove(conn) else {
                return;
            };
            let Some(room_id) = session.room else {
                debug!("Removed roomless session for connection {}", conn);
                return;
            };
            if directory.remove_member(&room_id, conn) {
                Some(room_snapshot(registry, directory, &room_id))
            } else {
                None
            }
        };

        if let Some(update) = update {
            info!("Connection {} disconnected from room {}", conn, update.room_id);
            self.broadcast_roster(&update);
        }
    }

    fn broadcast_roster(&self, update: &RoomUpdate) {
        self.broadcaster.broadcast(
            update.members.iter().copied(),
            &ServerEvent::UserList {
                users: update.roster.clone(),
            },
            None,
        );
    }

    fn lock_core(&self) -> MutexGuard<'_, CoreState> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Inspection, used by the diagnostics endpoint and integration tests.

    pub fn room_exists(&self, room_id: &str) -> bool {
        self.lock_core().directory.contains(room_id)
    }

    pub fn room_members(&self, room_id: &str) -> HashSet<ConnectionId> {
        self.lock_core().directory.members_of(room_id)
    }

    pub fn session_room(&self, conn: ConnectionId) -> Option<RoomId> {
        self.lock_core().registry.get(conn).and_then(|s| s.room.clone())
    }

    pub fn session_count(&self) -> usize {
        self.lock_core().registry.len()
    }

    pub fn room_count(&self) -> usize {
        self.lock_core().directory.len()
    }

    pub fn pending_removal_count(&self) -> usize {
        self.pending_removals.len()
    }
}

/// Pull a connection out of whatever room it is currently in, keeping the
/// one-room-per-connection invariant across create/join. Returns a snapshot
/// of the departed room for a roster broadcast, if a membership was removed.
fn detach_from_current_room(
    registry: &mut ConnectionRegistry,
    directory: &mut RoomDirectory,
    conn: ConnectionId,
) -> Option<RoomUpdate> {
    let old_room = registry.get(conn).and_then(|s| s.room.clone())?;
    let removed = directory.remove_member(&old_room, conn);
    registry.clear_room(conn);
    if removed {
        Some(room_snapshot(registry, directory, &old_room))
    } else {
        None
    }
}

/// Recompute the full identity-resolved roster for a room. Full-list payloads
/// keep client state trivial; O(room size) is fine at tens of members.
fn room_snapshot(
    registry: &ConnectionRegistry,
    directory: &RoomDirectory,
    room_id: &str,
) -> RoomUpdate {
    let members = directory.members_of(room_id);
    let mut roster: Vec<RosterUser> = members
        .iter()
        .filter_map(|conn| registry.get(*conn))
        .map(|session| RosterUser {
            username: session.username.clone(),
            avatar: session.avatar.clone(),
        })
        .collect();
    roster.sort_by(|a, b| a.username.cmp(&b.username));
    RoomUpdate {
        room_id: RoomId::from(room_id),
        members,
        roster,
    }
}
