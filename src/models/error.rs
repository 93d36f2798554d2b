/// Errors raised by the room core.
///
/// Stale-reference removals (member or session already gone) are not part of
/// this taxonomy: they are silently tolerated no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    /// Join against a room id the directory does not know.
    RoomNotFound,
    /// Room creation with an id already present. The allocator retries this;
    /// it is an invariant violation if it reaches a caller.
    DuplicateRoom,
    /// The allocator gave up after its bounded retries. Operational alarm,
    /// not expected in practice.
    AllocationExhausted,
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomError::RoomNotFound => write!(f, "Room not found"),
            RoomError::DuplicateRoom => write!(f, "Duplicate room id"),
            RoomError::AllocationExhausted => write!(f, "Room id allocation exhausted"),
        }
    }
}

impl std::error::Error for RoomError {}
