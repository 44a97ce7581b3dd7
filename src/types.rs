use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type MessageId = String;

/// Which of the two positions in a room a player occupies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    Player1,
    Player2,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::Player1 => Seat::Player2,
            Seat::Player2 => Seat::Player1,
        }
    }
}

/// An occupied player position. An empty position is `None` on the room,
/// so a slot is never half-populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    /// Image assigned for the current round (data URL)
    #[serde(default)]
    pub image: Option<String>,
    /// Prompt the image was generated from; the opponent's guessing target
    #[serde(default)]
    pub prompt: Option<String>,
}

impl PlayerSlot {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            image: None,
            prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Winner {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub code: RoomCode,
    pub player1: Option<PlayerSlot>,
    pub player2: Option<PlayerSlot>,
    pub round_active: bool,
    #[serde(default)]
    pub last_winner: Option<Winner>,
    /// ISO timestamp of room creation
    pub created_at: String,
    /// Bumped by the store on every write; used for conditional updates
    #[serde(default)]
    pub version: u64,
}

impl Room {
    /// A fresh room with the creator seated as player 1
    pub fn new(code: RoomCode, creator: PlayerSlot) -> Self {
        Self {
            code,
            player1: Some(creator),
            player2: None,
            round_active: false,
            last_winner: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            version: 0,
        }
    }

    pub fn slot(&self, seat: Seat) -> Option<&PlayerSlot> {
        match seat {
            Seat::Player1 => self.player1.as_ref(),
            Seat::Player2 => self.player2.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, seat: Seat) -> Option<&mut PlayerSlot> {
        match seat {
            Seat::Player1 => self.player1.as_mut(),
            Seat::Player2 => self.player2.as_mut(),
        }
    }

    /// Find which seat (if any) the given identity occupies
    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        if self.player1.as_ref().is_some_and(|p| p.id == player_id) {
            Some(Seat::Player1)
        } else if self.player2.as_ref().is_some_and(|p| p.id == player_id) {
            Some(Seat::Player2)
        } else {
            None
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupants() == 2
    }

    /// Number of occupied seats
    pub fn occupants(&self) -> usize {
        usize::from(self.player1.is_some()) + usize::from(self.player2.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: PlayerId,
    pub sender_name: String,
    pub text: String,
    /// Store-assigned creation time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

/// A chat message before the store has assigned its id and timestamp
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: PlayerId,
    pub sender_name: String,
    pub text: String,
}
