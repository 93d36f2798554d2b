use axum::{extract::State, Json};
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::AppState;

/// Report live counts of connections, rooms, sessions and pending removals.
pub async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let n_conn = state.router.broadcaster().connection_count() as u32;
    let n_rooms = state.router.room_count() as u32;
    let n_sessions = state.router.session_count() as u32;
    let n_pending_removals = state.router.pending_removal_count() as u32;

    info!(
        "Diagnostics: Conn: {}, Rooms: {}, Sessions: {}, Pending removals: {}",
        n_conn, n_rooms, n_sessions, n_pending_removals
    );

    Json(DiagnosticsResponse {
        n_conn,
        n_rooms,
        n_sessions,
        n_pending_removals,
    })
}
