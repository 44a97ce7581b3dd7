//! Room session controller.
//!
//! One `RoomSession` per connected client. It owns the client's local view of
//! the room (kept fresh through store subscriptions) and drives the room
//! lifecycle and guessing game through the injected store and image generator.

mod chat;
mod notice;
mod room;
mod round;
mod view;

use crate::identity::Identity;
use crate::images::ImageGenerator;
use crate::protocol::ServerMessage;
use crate::store::{DocumentStore, StoreError, Subscription};
use crate::types::*;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

pub use notice::{Notifier, NOTICE_TTL};
pub use room::{generate_room_code, vacate, JoinOutcome, Vacate, ROOM_CODE_LENGTH};
pub use round::{is_correct_guess, GuessOutcome};
pub use view::PlayerView;

/// Attempts for read-modify-write cycles that lose a version race
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Everything a session operation can fail with. None of these are fatal;
/// they are reported to the player and local state stays as it was.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Room code is wrong or the room no longer exists")]
    RoomNotFound,

    #[error("The room is already full")]
    RoomFull,

    #[error("You are not a player in this room")]
    NoSuchPlayer,

    #[error("You are not in a room")]
    NotInRoom,

    #[error("Two players are needed for a round")]
    NotEnoughPlayers,

    #[error("Image generation failed: {0}")]
    ImageGenerationFailed(String),

    #[error("Could not save changes: {0}")]
    RemoteWriteFailed(String),

    #[error("Please enter {0}")]
    ValidationFailed(&'static str),
}

impl SessionError {
    /// Stable code for clients and logs
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::RoomNotFound => "ROOM_NOT_FOUND",
            SessionError::RoomFull => "ROOM_FULL",
            SessionError::NoSuchPlayer => "NO_SUCH_PLAYER",
            SessionError::NotInRoom => "NOT_IN_ROOM",
            SessionError::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            SessionError::ImageGenerationFailed(_) => "IMAGE_GENERATION_FAILED",
            SessionError::RemoteWriteFailed(_) => "REMOTE_WRITE_FAILED",
            SessionError::ValidationFailed(_) => "VALIDATION_FAILED",
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => SessionError::RoomNotFound,
            other => SessionError::RemoteWriteFailed(other.to_string()),
        }
    }
}

/// Trim a required text field, rejecting blanks
pub(crate) fn required(field: &'static str, value: &str) -> SessionResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SessionError::ValidationFailed(field));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Lobby,
    InRoom,
}

/// Client-side state; derived from subscriptions, never persisted
#[derive(Debug)]
struct LocalState {
    screen: Screen,
    room_code: Option<RoomCode>,
    display_name: Option<String>,
    room: Option<Room>,
    messages: Vec<ChatMessage>,
}

impl LocalState {
    fn lobby() -> Self {
        Self {
            screen: Screen::Lobby,
            room_code: None,
            display_name: None,
            room: None,
            messages: Vec::new(),
        }
    }
}

/// Outcome of one read-decide step inside [`RoomSession::transact`]
enum Step<T> {
    /// Write `next` (`None` deletes the room), then yield the value
    Write(Option<Room>, T),
    /// Leave the room as it is
    Keep(T),
}

pub struct RoomSession {
    store: Arc<dyn DocumentStore>,
    images: Arc<dyn ImageGenerator>,
    identity: Identity,
    image_timeout: Duration,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    notifier: Notifier,
    local: Arc<Mutex<LocalState>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl RoomSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        images: Arc<dyn ImageGenerator>,
        identity: Identity,
        image_timeout: Duration,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            store,
            images,
            identity,
            image_timeout,
            notifier: Notifier::new(outbound.clone(), NOTICE_TTL),
            outbound,
            local: Arc::new(Mutex::new(LocalState::lobby())),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn player_id(&self) -> &str {
        &self.identity.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn screen(&self) -> Screen {
        self.local().screen
    }

    pub fn room_code(&self) -> Option<RoomCode> {
        self.local().room_code.clone()
    }

    /// Last room snapshot received
    pub fn room(&self) -> Option<Room> {
        self.local().room.clone()
    }

    /// Last message window received
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.local().messages.clone()
    }

    /// The local player's view of the current room
    pub fn view(&self) -> Option<PlayerView> {
        self.local()
            .room
            .as_ref()
            .map(|room| PlayerView::project(room, &self.identity.id))
    }

    fn local(&self) -> MutexGuard<'_, LocalState> {
        lock(&self.local)
    }

    fn push(&self, msg: ServerMessage) {
        let _ = self.outbound.send(msg);
    }

    fn current_code(&self) -> SessionResult<RoomCode> {
        self.room_code().ok_or(SessionError::NotInRoom)
    }

    fn display_name(&self) -> SessionResult<String> {
        self.local()
            .display_name
            .clone()
            .ok_or(SessionError::NotInRoom)
    }

    /// Switch local state to the given room and start listening to it
    async fn enter_room(&self, room: Room, display_name: String) -> SessionResult<()> {
        self.drop_subscriptions();
        let code = room.code.clone();
        {
            let mut local = self.local();
            local.screen = Screen::InRoom;
            local.room_code = Some(code.clone());
            local.display_name = Some(display_name);
            local.room = Some(room);
            local.messages.clear();
        }

        let room_listener = self.room_listener(code.clone());
        let messages_listener = self.messages_listener(code.clone());
        let room_sub = self.store.subscribe_room(&code, room_listener).await?;
        let messages_sub = self
            .store
            .subscribe_messages(&code, crate::store::MESSAGE_WINDOW, messages_listener)
            .await?;

        lock(&self.subscriptions).extend([room_sub, messages_sub]);
        Ok(())
    }

    /// Back to the lobby, forgetting the room
    fn reset_local(&self) {
        self.drop_subscriptions();
        *self.local() = LocalState::lobby();
        self.push(ServerMessage::RoomState { view: None });
        self.push(ServerMessage::Messages { list: Vec::new() });
    }

    fn drop_subscriptions(&self) {
        let subs: Vec<Subscription> = lock(&self.subscriptions).drain(..).collect();
        for sub in subs {
            sub.unsubscribe();
        }
    }

    /// Read-decide-write on a room with compare-and-swap, retrying when another
    /// client wrote in between. Returns what was written (or the unchanged room)
    /// together with the decision's value.
    async fn transact<T, F>(&self, code: &str, mut decide: F) -> SessionResult<(Option<Room>, T)>
    where
        F: FnMut(Room) -> SessionResult<Step<T>> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let room = self
                .store
                .get_room(code)
                .await?
                .ok_or(SessionError::RoomNotFound)?;
            let version = room.version;

            match decide(room.clone())? {
                Step::Keep(value) => return Ok((Some(room), value)),
                Step::Write(next, value) => {
                    match self.store.replace_room_if(code, version, next).await {
                        Ok(stored) => return Ok((stored, value)),
                        Err(StoreError::VersionConflict { expected, actual }) => {
                            tracing::warn!(
                                room = %code,
                                attempt,
                                expected,
                                actual,
                                "Room changed underneath us, retrying"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Err(SessionError::RemoteWriteFailed(format!(
            "room {} kept changing, gave up after {} attempts",
            code, MAX_WRITE_ATTEMPTS
        )))
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.drop_subscriptions();
    }
}

/// Lock ignoring poisoning; local state is always left consistent between writes
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
