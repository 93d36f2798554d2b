use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::models::{ConnectionId, ServerEvent};

/// Sender half of one connection's outbound channel. The WebSocket writer
/// task owns the receiving end; anything holding a clone of this can push
/// events to that client without blocking.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Delivers events to connection sets with at-most-once delivery per
/// recipient. A recipient whose channel is already torn down is logged and
/// skipped; one failed recipient never aborts delivery to the rest.
#[derive(Clone, Default)]
pub struct Broadcaster {
    connections: Arc<DashMap<ConnectionId, ConnectionSender>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound sender. Called once at socket accept.
    pub fn register(&self, conn: ConnectionId, tx: ConnectionSender) {
        self.connections.insert(conn, tx);
    }

    /// Drop a connection's outbound sender. Idempotent.
    pub fn unregister(&self, conn: ConnectionId) {
        self.connections.remove(&conn);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send an event to a single connection, bypassing room resolution.
    /// Used for reply-only responses such as join acknowledgements.
    pub fn unicast(&self, conn: ConnectionId, event: &ServerEvent) {
        let Some(text) = encode(event) else { return };
        self.deliver(conn, &text);
    }

    /// Fan an event out to every target connection except `exclude`.
    /// The target set is resolved by the router under its core lock so the
    /// recipients match the membership state the event was computed from.
    pub fn broadcast<I>(&self, targets: I, event: &ServerEvent, exclude: Option<ConnectionId>)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let Some(text) = encode(event) else { return };
        for conn in targets {
            if Some(conn) == exclude {
                continue;
            }
            self.deliver(conn, &text);
        }
    }

    fn deliver(&self, conn: ConnectionId, text: &str) {
        let Some(tx) = self.connections.get(&conn) else {
            debug!("Skipping delivery to unknown connection {}", conn);
            return;
        };
        if tx.send(Message::Text(text.to_string())).is_err() {
            debug!("Skipping delivery to closed connection {}", conn);
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to serialize outbound event: {}", e);
            None
        }
    }
}
