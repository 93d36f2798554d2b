use axum::{routing::get, Router};

use crate::handlers::{diagnostics, health_check, ready_check};
use crate::websocket::handler::websocket_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(health_check))
        .route("/v1/ready", get(ready_check))
        .route("/v1/diagnostics", get(diagnostics))
}

/// Create the full application router: API routes plus the WebSocket upgrade.
pub fn create_app_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_routes())
        .route("/ws", get(websocket_handler))
        .with_state(state)
}
