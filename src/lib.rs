pub mod config;
pub mod handlers;
pub mod models;
pub mod rooms;
pub mod routes;
pub mod websocket;

use config::Config;
use rooms::{Broadcaster, EventRouter};

/// Shared application state passed to all handlers via the axum State
/// extractor. Cloning is cheap; all fields share their backing storage.
#[derive(Clone)]
pub struct AppState {
    pub router: EventRouter,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            router: EventRouter::new(Broadcaster::new(), config.disconnect_grace()),
        }
    }
}
