use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};

/// What changed in a room, fanned out to that room's subscribers
#[derive(Debug, Clone, Copy, PartialEq)]
enum Change {
    Room,
    Messages,
}

/// In-process document store.
///
/// Rooms and messages live in memory behind `RwLock`s; every room gets its own
/// broadcast channel so subscribers only wake up for the room they watch.
#[derive(Clone)]
pub struct MemoryStore {
    namespace: String,
    pub(super) rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    pub(super) messages: Arc<RwLock<HashMap<RoomCode, Vec<ChatMessage>>>>,
    changes: Arc<RwLock<HashMap<RoomCode, broadcast::Sender<Change>>>>,
}

impl MemoryStore {
    pub fn new(app_id: &str) -> Self {
        Self {
            namespace: app_id.to_string(),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Collection path rooms are stored under
    pub fn rooms_path(&self) -> String {
        format!("artifacts/{}/public/data/rooms", self.namespace)
    }

    pub fn room_path(&self, code: &str) -> String {
        format!("{}/{}", self.rooms_path(), code)
    }

    pub fn messages_path(&self, code: &str) -> String {
        format!("{}/messages", self.room_path(code))
    }

    /// Subscribe to a room's change feed, creating the channel on first use.
    /// Done under the write lock so `notify` can't drop the channel in between.
    async fn receiver(&self, code: &str) -> broadcast::Receiver<Change> {
        let mut changes = self.changes.write().await;
        // Channels whose subscribers have all gone away
        changes.retain(|_, tx| tx.receiver_count() > 0);
        changes
            .entry(code.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .subscribe()
    }

    async fn notify(&self, code: &str, change: Change) {
        let mut changes = self.changes.write().await;
        if let Some(tx) = changes.get(code) {
            // No receivers left: forget the channel
            if tx.send(change).is_err() {
                changes.remove(code);
            }
        }
    }

    /// Send the final change for a removed room and drop its channel, which
    /// ends every subscription to it
    async fn retire(&self, code: &str) {
        if let Some(tx) = self.changes.write().await.remove(code) {
            let _ = tx.send(Change::Room);
        }
    }

    /// Notify every watched room; used after bulk replacement
    pub(super) async fn notify_all(&self) {
        let codes: Vec<RoomCode> = self.changes.read().await.keys().cloned().collect();
        for code in codes {
            if self.rooms.read().await.contains_key(&code) {
                self.notify(&code, Change::Room).await;
                self.notify(&code, Change::Messages).await;
            } else {
                self.retire(&code).await;
            }
        }
    }

    #[cfg(test)]
    async fn channel_count(&self) -> usize {
        self.changes.read().await.len()
    }

    async fn message_window(
        messages: &RwLock<HashMap<RoomCode, Vec<ChatMessage>>>,
        code: &str,
        limit: usize,
    ) -> Vec<ChatMessage> {
        messages
            .read()
            .await
            .get(code)
            .map(|list| list[list.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_room(&self, code: &str) -> StoreResult<Option<Room>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn put_room(&self, mut room: Room) -> StoreResult<Room> {
        let code = room.code.clone();
        {
            let mut rooms = self.rooms.write().await;
            room.version = rooms.get(&code).map(|r| r.version).unwrap_or(0) + 1;
            rooms.insert(code.clone(), room.clone());
        }
        self.notify(&code, Change::Room).await;
        Ok(room)
    }

    async fn insert_room(&self, mut room: Room) -> StoreResult<Room> {
        let code = room.code.clone();
        {
            let mut rooms = self.rooms.write().await;
            if rooms.contains_key(&code) {
                return Err(StoreError::AlreadyExists(self.room_path(&code)));
            }
            room.version = 1;
            rooms.insert(code.clone(), room.clone());
        }
        tracing::debug!(path = %self.room_path(&code), "Room document created");
        self.notify(&code, Change::Room).await;
        Ok(room)
    }

    async fn update_room(&self, code: &str, patch: RoomPatch) -> StoreResult<Room> {
        let updated = {
            let mut rooms = self.rooms.write().await;
            let room = rooms
                .get_mut(code)
                .ok_or_else(|| StoreError::NotFound(self.room_path(code)))?;
            patch.apply(room);
            room.version += 1;
            room.clone()
        };
        self.notify(code, Change::Room).await;
        Ok(updated)
    }

    async fn replace_room_if(
        &self,
        code: &str,
        expected_version: u64,
        next: Option<Room>,
    ) -> StoreResult<Option<Room>> {
        let result = {
            let mut rooms = self.rooms.write().await;
            let actual = rooms
                .get(code)
                .map(|r| r.version)
                .ok_or_else(|| StoreError::NotFound(self.room_path(code)))?;
            if actual != expected_version {
                return Err(StoreError::VersionConflict {
                    expected: expected_version,
                    actual,
                });
            }

            match next {
                Some(mut room) => {
                    room.code = code.to_string();
                    room.version = actual + 1;
                    rooms.insert(code.to_string(), room.clone());
                    Some(room)
                }
                None => {
                    rooms.remove(code);
                    None
                }
            }
        };
        if result.is_some() {
            self.notify(code, Change::Room).await;
        } else {
            self.retire(code).await;
        }
        Ok(result)
    }

    async fn delete_room(&self, code: &str) -> StoreResult<()> {
        let removed = self.rooms.write().await.remove(code).is_some();
        if removed {
            tracing::debug!(path = %self.room_path(code), "Room document deleted");
            self.retire(code).await;
        }
        Ok(())
    }

    async fn add_message(&self, code: &str, message: NewMessage) -> StoreResult<ChatMessage> {
        if !self.rooms.read().await.contains_key(code) {
            return Err(StoreError::NotFound(self.room_path(code)));
        }

        let stored = {
            let mut messages = self.messages.write().await;
            let list = messages.entry(code.to_string()).or_default();

            // Keep timestamps non-decreasing so ordering by time matches insertion
            let now = chrono::Utc::now().timestamp_millis();
            let timestamp_ms = list.last().map_or(now, |last| now.max(last.timestamp_ms));

            let stored = ChatMessage {
                id: ulid::Ulid::new().to_string(),
                sender_id: message.sender_id,
                sender_name: message.sender_name,
                text: message.text,
                timestamp_ms,
            };
            list.push(stored.clone());
            stored
        };
        self.notify(code, Change::Messages).await;
        Ok(stored)
    }

    async fn list_messages(&self, code: &str, limit: usize) -> StoreResult<Vec<ChatMessage>> {
        Ok(Self::message_window(&self.messages, code, limit).await)
    }

    async fn delete_messages(&self, code: &str) -> StoreResult<usize> {
        let removed = self
            .messages
            .write()
            .await
            .remove(code)
            .map_or(0, |list| list.len());
        if removed > 0 {
            tracing::debug!(path = %self.messages_path(code), removed, "Messages purged");
            self.notify(code, Change::Messages).await;
        }
        Ok(removed)
    }

    async fn subscribe_room(
        &self,
        code: &str,
        listener: RoomListener,
    ) -> StoreResult<Subscription> {
        // Subscribe before reading so no change slips between snapshot and stream
        let mut rx = self.receiver(code).await;
        listener(self.rooms.read().await.get(code).cloned());

        let rooms = self.rooms.clone();
        let code = code.to_string();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Change::Room) | Err(RecvError::Lagged(_)) => {
                        let snapshot = rooms.read().await.get(&code).cloned();
                        listener(snapshot);
                    }
                    Ok(Change::Messages) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(task))
    }

    async fn subscribe_messages(
        &self,
        code: &str,
        limit: usize,
        listener: MessagesListener,
    ) -> StoreResult<Subscription> {
        let mut rx = self.receiver(code).await;
        listener(Self::message_window(&self.messages, code, limit).await);

        let messages = self.messages.clone();
        let code = code.to_string();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(Change::Messages) | Err(RecvError::Lagged(_)) => {
                        listener(Self::message_window(&messages, &code, limit).await);
                    }
                    Ok(Change::Room) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(task))
    }

    async fn room_count(&self) -> StoreResult<usize> {
        Ok(self.rooms.read().await.len())
    }
}
