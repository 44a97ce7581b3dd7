use super::*;
use crate::store::StoreError;
use rand::Rng;

/// Characters used in room codes (base 36, upper case)
const CODE_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const ROOM_CODE_LENGTH: usize = 6;

/// Fresh codes to try before giving up on creating a room
const MAX_CODE_ATTEMPTS: u32 = 8;

/// Generate a random room code
pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn normalize_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Joined(Room),
    /// Caller already holds a seat; nothing was written
    AlreadyInRoom(Room),
}

impl JoinOutcome {
    pub fn room(&self) -> &Room {
        match self {
            JoinOutcome::Joined(room) | JoinOutcome::AlreadyInRoom(room) => room,
        }
    }
}

/// What leaving does to a room
#[derive(Debug, Clone, PartialEq)]
pub enum Vacate {
    /// Room stays with the remaining player
    Updated(Room),
    /// Last player left
    Deleted,
    /// Caller holds no seat; nothing to do
    NotSeated,
}

/// Compute the room after `player_id` leaves.
///
/// Player 2 is promoted into seat 1 with all its state when player 1 leaves,
/// and any running round stops.
pub fn vacate(room: &Room, player_id: &str) -> Vacate {
    let mut next = room.clone();
    match room.seat_of(player_id) {
        Some(Seat::Player1) => match next.player2.take() {
            Some(promoted) => {
                next.player1 = Some(promoted);
                next.round_active = false;
                Vacate::Updated(next)
            }
            None => Vacate::Deleted,
        },
        Some(Seat::Player2) => {
            next.player2 = None;
            next.round_active = false;
            Vacate::Updated(next)
        }
        None => Vacate::NotSeated,
    }
}

impl RoomSession {
    /// Create a room with the caller in seat 1
    pub async fn create_room(&self, display_name: &str) -> SessionResult<Room> {
        let name = required("your name", display_name)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_room_code();
            let room = Room::new(
                code.clone(),
                PlayerSlot::new(self.identity.id.clone(), name.clone()),
            );

            match self.store.insert_room(room).await {
                Ok(room) => {
                    tracing::info!(room = %code, player = %self.identity.id, "Room created");
                    self.leave_previous(&code).await;
                    self.enter_room(room.clone(), name).await?;
                    return Ok(room);
                }
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::warn!(room = %code, "Room code already taken, generating another");
                }
                Err(e) => {
                    tracing::error!("Failed to create room: {}", e);
                    return Err(e.into());
                }
            }
        }

        Err(SessionError::RemoteWriteFailed(
            "no free room code found".to_string(),
        ))
    }

    /// Take the free seat in an existing room
    pub async fn join_room(&self, code: &str, display_name: &str) -> SessionResult<JoinOutcome> {
        let code = normalize_code(&required("the room code", code)?);
        let name = required("your name", display_name)?;

        // The old room is only given up once the new seat is ours
        let me = self.identity.id.clone();
        let (room, already_seated) = self
            .transact(&code, |room| {
                if room.seat_of(&me).is_some() {
                    return Ok(Step::Keep(true));
                }
                if room.is_full() {
                    return Err(SessionError::RoomFull);
                }

                let mut next = room;
                let slot = PlayerSlot::new(me.clone(), name.clone());
                if next.player1.is_none() {
                    next.player1 = Some(slot);
                } else {
                    next.player2 = Some(slot);
                }
                Ok(Step::Write(Some(next), false))
            })
            .await?;
        let room = room.ok_or(SessionError::RoomNotFound)?;

        self.leave_previous(&code).await;
        self.enter_room(room.clone(), name).await?;
        if already_seated {
            tracing::info!(room = %code, player = %me, "Player re-entered room");
            Ok(JoinOutcome::AlreadyInRoom(room))
        } else {
            tracing::info!(room = %code, player = %me, "Player joined room");
            Ok(JoinOutcome::Joined(room))
        }
    }

    /// Give up the caller's seat and return to the lobby.
    ///
    /// The seat change is a single conditional write; the chat purge that
    /// follows is idempotent and retried. Local state goes back to the lobby
    /// whether or not the remote part succeeded.
    pub async fn leave_room(&self) -> SessionResult<()> {
        let Some(code) = self.room_code() else {
            self.reset_local();
            return Ok(());
        };
        // Stop listening first so our own teardown isn't reported back to us
        self.reset_local();

        let me = self.identity.id.clone();
        let result = self
            .transact(&code, |room| {
                Ok(match vacate(&room, &me) {
                    Vacate::Updated(next) => Step::Write(Some(next), true),
                    Vacate::Deleted => Step::Write(None, true),
                    Vacate::NotSeated => Step::Keep(false),
                })
            })
            .await;

        match result {
            Ok((remaining, true)) => {
                if remaining.is_none() {
                    tracing::info!(room = %code, "Last player left, room deleted");
                } else {
                    tracing::info!(room = %code, player = %me, "Player left room");
                }
                self.purge_messages(&code).await
            }
            Ok((_, false)) | Err(SessionError::RoomNotFound) => Ok(()),
            Err(e) => {
                tracing::error!(room = %code, "Failed to leave room: {}", e);
                Err(e)
            }
        }
    }

    /// Leave the current room, if it isn't `next`, after moving to `next`
    async fn leave_previous(&self, next: &str) {
        if self.room_code().is_some_and(|current| current != next) {
            if let Err(e) = self.leave_room().await {
                tracing::warn!(player = %self.identity.id, "Failed to leave previous room: {}", e);
            }
        }
    }

    async fn purge_messages(&self, code: &str) -> SessionResult<()> {
        let mut attempt = 1;
        loop {
            match self.store.delete_messages(code).await {
                Ok(removed) => {
                    tracing::debug!(room = %code, removed, "Chat purged");
                    return Ok(());
                }
                Err(e) if attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(room = %code, attempt, "Chat purge failed, retrying: {}", e);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::session;
    use super::*;
    use crate::store::{MemoryStore, MESSAGE_WINDOW};
    use crate::types::NewMessage;

    fn two_player_room() -> Room {
        let mut p1 = PlayerSlot::new("p1".to_string(), "Alice".to_string());
        p1.score = 1;
        let mut p2 = PlayerSlot::new("p2".to_string(), "Bob".to_string());
        p2.score = 4;
        p2.image = Some("img-2".to_string());
        p2.prompt = Some("cute cat".to_string());
        let mut room = Room::new("AB12CD".to_string(), p1);
        room.player2 = Some(p2);
        room.round_active = true;
        room
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..200 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_vacate_promotes_player_two() {
        let room = two_player_room();
        let Vacate::Updated(next) = vacate(&room, "p1") else {
            panic!("expected update");
        };
        assert_eq!(next.player1, room.player2);
        assert!(next.player2.is_none());
        assert!(!next.round_active);
    }

    #[test]
    fn test_vacate_player_two() {
        let room = two_player_room();
        let Vacate::Updated(next) = vacate(&room, "p2") else {
            panic!("expected update");
        };
        assert_eq!(next.player1, room.player1);
        assert!(next.player2.is_none());
        assert!(!next.round_active);
    }

    #[test]
    fn test_vacate_last_player_and_stranger() {
        let mut room = two_player_room();
        assert_eq!(vacate(&room, "stranger"), Vacate::NotSeated);
        room.player2 = None;
        assert_eq!(vacate(&room, "p1"), Vacate::Deleted);
    }

    #[tokio::test]
    async fn test_create_room_seats_creator() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _rx) = session(&store, "p1", false);

        let room = alice.create_room("  Alice ").await.unwrap();
        let p1 = room.player1.as_ref().unwrap();
        assert_eq!(p1.id, "p1");
        assert_eq!(p1.name, "Alice");
        assert_eq!(p1.score, 0);
        assert!(room.player2.is_none());
        assert!(!room.round_active);

        assert_eq!(alice.screen(), Screen::InRoom);
        assert_eq!(alice.room_code(), Some(room.code.clone()));
        assert!(store.get_room(&room.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_room_requires_name() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _rx) = session(&store, "p1", false);

        let result = alice.create_room("   ").await;
        assert!(matches!(result, Err(SessionError::ValidationFailed(_))));
        assert_eq!(alice.screen(), Screen::Lobby);
        assert_eq!(store.room_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_join_fills_second_seat_only() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);

        let created = alice.create_room("Alice").await.unwrap();
        let outcome = bob
            .join_room(&created.code.to_lowercase(), "Bob")
            .await
            .unwrap();

        let JoinOutcome::Joined(room) = outcome else {
            panic!("expected a fresh join");
        };
        assert_eq!(room.player1, created.player1);
        assert_eq!(room.player2.as_ref().unwrap().id, "p2");
        assert_eq!(bob.screen(), Screen::InRoom);
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let store = Arc::new(MemoryStore::new("test"));
        let (bob, _rx) = session(&store, "p2", false);

        let result = bob.join_room("ZZZZZZ", "Bob").await;
        assert!(matches!(result, Err(SessionError::RoomNotFound)));
        assert_eq!(bob.screen(), Screen::Lobby);
    }

    #[tokio::test]
    async fn test_join_full_room_leaves_state_unchanged() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);
        let (carol, _c) = session(&store, "p3", false);

        let room = alice.create_room("Alice").await.unwrap();
        bob.join_room(&room.code, "Bob").await.unwrap();
        let before = store.get_room(&room.code).await.unwrap().unwrap();

        let result = carol.join_room(&room.code, "Carol").await;
        assert!(matches!(result, Err(SessionError::RoomFull)));
        assert_eq!(store.get_room(&room.code).await.unwrap().unwrap(), before);
        assert_eq!(carol.screen(), Screen::Lobby);
    }

    #[tokio::test]
    async fn test_rejoin_as_player_one_is_noop() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let room = alice.create_room("Alice").await.unwrap();

        let outcome = alice.join_room(&room.code, "Alice").await.unwrap();
        assert!(matches!(outcome, JoinOutcome::AlreadyInRoom(_)));
        assert_eq!(outcome.room().version, room.version);
    }

    #[tokio::test]
    async fn test_concurrent_joiners_get_one_seat() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);
        let (carol, _c) = session(&store, "p3", false);
        let room = alice.create_room("Alice").await.unwrap();

        let (b, c) = tokio::join!(
            bob.join_room(&room.code, "Bob"),
            carol.join_room(&room.code, "Carol")
        );
        let winners = [b.is_ok(), c.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);
        assert!(matches!(b.err().or(c.err()), Some(SessionError::RoomFull)));
    }

    #[tokio::test]
    async fn test_last_player_leaving_deletes_room_and_chat() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let room = alice.create_room("Alice").await.unwrap();
        alice.send_message("hello?").await.unwrap();

        alice.leave_room().await.unwrap();

        assert!(store.get_room(&room.code).await.unwrap().is_none());
        assert!(store
            .list_messages(&room.code, MESSAGE_WINDOW)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(alice.screen(), Screen::Lobby);
        assert!(alice.view().is_none());
    }

    #[tokio::test]
    async fn test_player_one_leaving_promotes_player_two() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);
        let room = alice.create_room("Alice").await.unwrap();
        bob.join_room(&room.code, "Bob").await.unwrap();
        bob.start_round().await.unwrap();
        let before = store.get_room(&room.code).await.unwrap().unwrap();
        store
            .add_message(
                &room.code,
                NewMessage {
                    sender_id: "p2".to_string(),
                    sender_name: "Bob".to_string(),
                    text: "hi".to_string(),
                },
            )
            .await
            .unwrap();

        alice.leave_room().await.unwrap();

        let after = store.get_room(&room.code).await.unwrap().unwrap();
        assert_eq!(after.player1, before.player2);
        assert!(after.player2.is_none());
        assert!(!after.round_active);
        assert!(store
            .list_messages(&room.code, MESSAGE_WINDOW)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_leave_without_room_is_harmless() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        alice.leave_room().await.unwrap();
        assert_eq!(alice.screen(), Screen::Lobby);
    }

    #[tokio::test]
    async fn test_failed_join_keeps_current_room() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);
        let (carol, _c) = session(&store, "p3", false);
        let home = alice.create_room("Alice").await.unwrap();

        let result = alice.join_room("ZZZZZZ", "Alice").await;
        assert!(matches!(result, Err(SessionError::RoomNotFound)));
        assert!(store.get_room(&home.code).await.unwrap().is_some());
        assert_eq!(alice.screen(), Screen::InRoom);
        assert_eq!(alice.room_code(), Some(home.code.clone()));

        let full = bob.create_room("Bob").await.unwrap();
        carol.join_room(&full.code, "Carol").await.unwrap();
        let result = alice.join_room(&full.code, "Alice").await;
        assert!(matches!(result, Err(SessionError::RoomFull)));
        assert!(store.get_room(&home.code).await.unwrap().is_some());
        assert_eq!(alice.room_code(), Some(home.code));
    }

    #[tokio::test]
    async fn test_switching_rooms_leaves_the_old_one() {
        let store = Arc::new(MemoryStore::new("test"));
        let (alice, _a) = session(&store, "p1", false);
        let (bob, _b) = session(&store, "p2", false);
        let home = alice.create_room("Alice").await.unwrap();
        let other = bob.create_room("Bob").await.unwrap();

        let outcome = alice.join_room(&other.code, "Alice").await.unwrap();
        assert!(matches!(outcome, JoinOutcome::Joined(_)));
        assert!(store.get_room(&home.code).await.unwrap().is_none());
        assert_eq!(alice.room_code(), Some(other.code.clone()));

        // Creating a new room gives up the joined seat
        let fresh = alice.create_room("Alice").await.unwrap();
        let other_now = store.get_room(&other.code).await.unwrap().unwrap();
        assert!(other_now.seat_of("p1").is_none());
        assert_eq!(alice.room_code(), Some(fresh.code));
    }
}
