use crate::types::*;
use serde::{Deserialize, Serialize};

/// What one player sees of a room.
///
/// Prompts are deliberately absent: they are the answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub room_code: RoomCode,
    /// `None` if the local identity holds neither seat
    pub seat: Option<Seat>,
    pub my_name: Option<String>,
    pub opponent_name: Option<String>,
    pub my_score: u32,
    pub opponent_score: u32,
    pub my_image: Option<String>,
    pub opponent_image: Option<String>,
    pub round_active: bool,
    pub last_winner: Option<Winner>,
    pub waiting_for_opponent: bool,
}

impl PlayerView {
    /// Project a room onto the given identity
    pub fn project(room: &Room, local_id: &str) -> Self {
        let seat = room.seat_of(local_id);
        let (mine, theirs) = match seat {
            Some(seat) => (room.slot(seat), room.slot(seat.other())),
            None => (None, None),
        };

        Self {
            room_code: room.code.clone(),
            seat,
            my_name: mine.map(|p| p.name.clone()),
            opponent_name: theirs.map(|p| p.name.clone()),
            my_score: mine.map_or(0, |p| p.score),
            opponent_score: theirs.map_or(0, |p| p.score),
            my_image: mine.and_then(|p| p.image.clone()),
            opponent_image: theirs.and_then(|p| p.image.clone()),
            round_active: room.round_active,
            last_winner: room.last_winner.clone(),
            waiting_for_opponent: !room.is_full(),
        }
    }
}
