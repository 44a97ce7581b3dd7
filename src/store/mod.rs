//! Document store contract for rooms and their chat messages.
//!
//! The session controller only talks to `dyn DocumentStore`, so the backing
//! database can be swapped (or faked in tests) without touching game logic.

mod export;
mod memory;

use crate::types::*;
use async_trait::async_trait;
use tokio::task::JoinHandle;

pub use export::{StoreSnapshot, SNAPSHOT_SCHEMA_VERSION};
pub use memory::MemoryStore;

/// How many chat messages a room subscription delivers
pub const MESSAGE_WINDOW: usize = 100;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when talking to the document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Image and prompt for one seat during a round (both `None` clears them)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotAssignment {
    pub image: Option<String>,
    pub prompt: Option<String>,
}

/// Field-level merge for a room document. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct RoomPatch {
    pub player1: Option<Option<PlayerSlot>>,
    pub player2: Option<Option<PlayerSlot>>,
    /// Applied after the slot overrides; ignored when the seat is empty
    pub player1_assignment: Option<SlotAssignment>,
    pub player2_assignment: Option<SlotAssignment>,
    pub round_active: Option<bool>,
    pub last_winner: Option<Option<Winner>>,
}

impl RoomPatch {
    pub fn apply(self, room: &mut Room) {
        if let Some(slot) = self.player1 {
            room.player1 = slot;
        }
        if let Some(slot) = self.player2 {
            room.player2 = slot;
        }
        for (seat, assignment) in [
            (Seat::Player1, self.player1_assignment),
            (Seat::Player2, self.player2_assignment),
        ] {
            if let (Some(assignment), Some(slot)) = (assignment, room.slot_mut(seat)) {
                slot.image = assignment.image;
                slot.prompt = assignment.prompt;
            }
        }
        if let Some(active) = self.round_active {
            room.round_active = active;
        }
        if let Some(winner) = self.last_winner {
            room.last_winner = winner;
        }
    }
}

/// Called with the latest room document (`None` once it is deleted)
pub type RoomListener = Box<dyn Fn(Option<Room>) + Send + Sync>;

/// Called with the latest message window, oldest first
pub type MessagesListener = Box<dyn Fn(Vec<ChatMessage>) + Send + Sync>;

/// Handle for a live subscription. Dropping it unsubscribes.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Trait that all room stores must implement
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of a room
    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>>;

    /// Full replace (creates the room if it doesn't exist)
    async fn put_room(&self, room: Room) -> StoreResult<Room>;

    /// Create a room only if no room with this code exists
    async fn insert_room(&self, room: Room) -> StoreResult<Room>;

    /// Merge the given fields into an existing room
    async fn update_room(&self, code: &str, patch: RoomPatch) -> StoreResult<Room>;

    /// Compare-and-swap on the room version. `None` deletes the room.
    async fn replace_room_if(
        &self,
        code: &str,
        expected_version: u64,
        next: Option<Room>,
    ) -> StoreResult<Option<Room>>;

    /// Delete a room document (no-op if it doesn't exist)
    async fn delete_room(&self, code: &str) -> StoreResult<()>;

    /// Append a message; the store assigns id and timestamp
    async fn add_message(&self, code: &str, message: NewMessage) -> StoreResult<ChatMessage>;

    /// The most recent `limit` messages, oldest first
    async fn list_messages(&self, code: &str, limit: usize) -> StoreResult<Vec<ChatMessage>>;

    /// Remove every message of a room, returning how many were removed
    async fn delete_messages(&self, code: &str) -> StoreResult<usize>;

    /// Push the room document now and after every change
    async fn subscribe_room(&self, code: &str, listener: RoomListener)
        -> StoreResult<Subscription>;

    /// Push the message window now and after every change
    async fn subscribe_messages(
        &self,
        code: &str,
        limit: usize,
        listener: MessagesListener,
    ) -> StoreResult<Subscription>;

    /// Number of live rooms
    async fn room_count(&self) -> StoreResult<usize>;
}
