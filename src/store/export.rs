//! Store export/import for quick and dirty state restoration.
//!
//! A snapshot is plain JSON holding every room and its chat history. Live
//! subscriptions are not part of it; they are re-established by clients.

use super::memory::MemoryStore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Schema version for export format compatibility
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    /// App namespace the rooms were stored under
    pub namespace: String,
    pub rooms: HashMap<RoomCode, Room>,
    #[serde(default)]
    pub messages: HashMap<RoomCode, Vec<ChatMessage>>,
}

impl StoreSnapshot {
    /// Validate the snapshot before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(format!(
                "Snapshot schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, SNAPSHOT_SCHEMA_VERSION
            ));
        }

        for (code, room) in &self.rooms {
            if *code != room.code {
                return Err(format!(
                    "Room stored under '{}' claims code '{}'",
                    code, room.code
                ));
            }
            if room.occupants() == 0 {
                return Err(format!("Room '{}' has no players", code));
            }
        }

        for code in self.messages.keys() {
            if !self.rooms.contains_key(code) {
                return Err(format!(
                    "Messages reference room '{}' which doesn't exist",
                    code
                ));
            }
        }

        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&json).map_err(|e| format!("Invalid snapshot: {}", e))
    }
}

impl MemoryStore {
    /// Capture every room and message
    pub async fn export(&self) -> StoreSnapshot {
        StoreSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            namespace: self.namespace().to_string(),
            rooms: self.rooms.read().await.clone(),
            messages: self.messages.read().await.clone(),
        }
    }

    /// Replace all contents with a validated snapshot
    pub async fn import(&self, snapshot: StoreSnapshot) -> Result<(), String> {
        snapshot.validate()?;

        if snapshot.namespace != self.namespace() {
            tracing::warn!(
                "Importing snapshot from namespace '{}' into '{}'",
                snapshot.namespace,
                self.namespace()
            );
        }

        let room_count = snapshot.rooms.len();
        *self.rooms.write().await = snapshot.rooms;
        *self.messages.write().await = snapshot.messages;
        self.notify_all().await;

        tracing::info!("Imported snapshot with {} rooms", room_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MESSAGE_WINDOW};

    fn room(code: &str) -> Room {
        Room::new(
            code.to_string(),
            PlayerSlot::new("p1".to_string(), "Alice".to_string()),
        )
    }

    fn snapshot() -> StoreSnapshot {
        StoreSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            namespace: "test".to_string(),
            rooms: HashMap::from([("AAAAAA".to_string(), room("AAAAAA"))]),
            messages: HashMap::new(),
        }
    }

    #[test]
    fn test_validation_future_schema() {
        let mut snap = snapshot();
        snap.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        let result = snap.validate();
        assert!(result.unwrap_err().contains("newer than supported"));
    }

    #[test]
    fn test_validation_orphan_messages() {
        let mut snap = snapshot();
        snap.messages.insert("ZZZZZZ".to_string(), Vec::new());
        let result = snap.validate();
        assert!(result.unwrap_err().contains("doesn't exist"));
    }

    #[test]
    fn test_validation_mismatched_key() {
        let mut snap = snapshot();
        snap.rooms.insert("BBBBBB".to_string(), room("CCCCCC"));
        let result = snap.validate();
        assert!(result.unwrap_err().contains("claims code"));
    }

    #[test]
    fn test_validation_empty_room() {
        let mut snap = snapshot();
        let mut empty = room("BBBBBB");
        empty.player1 = None;
        snap.rooms.insert("BBBBBB".to_string(), empty);
        let result = snap.validate();
        assert!(result.unwrap_err().contains("has no players"));
    }

    #[tokio::test]
    async fn test_export_import_through_file() {
        let source = MemoryStore::new("test");
        source.insert_room(room("AAAAAA")).await.unwrap();
        source
            .add_message(
                "AAAAAA",
                NewMessage {
                    sender_id: "p1".to_string(),
                    sender_name: "Alice".to_string(),
                    text: "hello".to_string(),
                },
            )
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        source.export().await.save_to_file(&path).unwrap();

        let target = MemoryStore::new("test");
        let loaded = StoreSnapshot::load_from_file(&path).unwrap();
        target.import(loaded).await.unwrap();

        let restored = target.get_room("AAAAAA").await.unwrap().unwrap();
        assert_eq!(restored.player1.unwrap().name, "Alice");
        let messages = target
            .list_messages("AAAAAA", MESSAGE_WINDOW)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
    }

    #[tokio::test]
    async fn test_import_rejects_invalid_snapshot() {
        let target = MemoryStore::new("test");
        target.insert_room(room("KEEPME")).await.unwrap();

        let mut snap = snapshot();
        snap.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        assert!(target.import(snap).await.is_err());

        // Existing contents untouched
        assert!(target.get_room("KEEPME").await.unwrap().is_some());
    }
}
