use crate::session::PlayerView;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        display_name: String,
    },
    JoinRoom {
        room_code: String,
        display_name: String,
    },
    /// Generate images and open a round (requires two players)
    StartRound,
    /// Swap both images mid-round for fresh ones
    ChangeImages,
    Guess {
        text: String,
    },
    EndRound,
    LeaveRoom,
    SendMessage {
        text: String,
    },
}

impl ClientMessage {
    /// Messages that wait on the image API and shouldn't block the connection
    pub fn is_slow(&self) -> bool {
        matches!(self, ClientMessage::StartRound | ClientMessage::ChangeImages)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        player_id: PlayerId,
        /// False when the identity only lives as long as this connection
        durable: bool,
        server_now: String,
    },
    /// Current room as seen by this player (`None` = back in the lobby)
    RoomState {
        view: Option<PlayerView>,
    },
    /// Latest chat window, oldest first
    Messages {
        list: Vec<ChatMessage>,
    },
    /// Image generation in flight
    Loading {
        active: bool,
    },
    /// Transient notification; dismissed by a matching `NoticeDismissed`
    Notice {
        id: String,
        kind: NoticeKind,
        text: String,
    },
    NoticeDismissed {
        id: String,
    },
    GuessResult {
        correct: bool,
    },
    Error {
        code: String,
        msg: String,
    },
}
