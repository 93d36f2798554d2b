use rand::Rng;
use tracing::warn;

use crate::models::{RoomError, RoomId};
use crate::rooms::directory::RoomDirectory;

/// 36^6 distinct codes, plenty for the expected room count.
const ROOM_ID_LEN: usize = 6;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_ATTEMPTS: u32 = 5;

/// Draw one candidate room id.
pub fn candidate_id() -> RoomId {
    let mut rng = rand::thread_rng();
    (0..ROOM_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Allocate a fresh room id and insert the empty room into the directory,
/// redrawing on collision. Exhausting the retry budget is an operational
/// alarm condition, not expected in practice.
pub fn allocate(directory: &mut RoomDirectory) -> Result<RoomId, RoomError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let room_id = candidate_id();
        match directory.create(&room_id) {
            Ok(()) => return Ok(room_id),
            Err(RoomError::DuplicateRoom) => {
                warn!(
                    "Room id collision on '{}' (attempt {}/{}), redrawing",
                    room_id, attempt, MAX_ATTEMPTS
                );
            }
            Err(e) => return Err(e),
        }
    }
    Err(RoomError::AllocationExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_ids_use_the_code_alphabet() {
        for _ in 0..100 {
            let id = candidate_id();
            assert_eq!(id.len(), ROOM_ID_LEN);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn sequential_allocations_do_not_collide() {
        let mut directory = RoomDirectory::new();
        for _ in 0..10_000 {
            allocate(&mut directory).unwrap();
        }
        assert_eq!(directory.len(), 10_000);
    }
}
