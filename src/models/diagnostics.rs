use serde::{Deserialize, Serialize};

/// Response for diagnostics information
#[derive(Serialize, Deserialize)]
pub struct DiagnosticsResponse {
    pub n_conn: u32,
    pub n_rooms: u32,
    pub n_sessions: u32,
    pub n_pending_removals: u32,
}
