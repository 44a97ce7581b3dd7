use crate::store::{MemoryStore, StoreSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Load a saved snapshot into the store. A missing file is not an error.
pub async fn restore(store: &MemoryStore, path: &Path) -> Result<bool, String> {
    if !path.exists() {
        tracing::info!("No snapshot at {}, starting empty", path.display());
        return Ok(false);
    }
    let snapshot = StoreSnapshot::load_from_file(path)?;
    store.import(snapshot).await?;
    tracing::info!("Restored rooms from {}", path.display());
    Ok(true)
}

/// Write the current store contents to disk
pub async fn save(store: &MemoryStore, path: &Path) -> Result<(), String> {
    let snapshot = store.export().await;
    let rooms = snapshot.rooms.len();
    snapshot.save_to_file(path)?;
    tracing::debug!("Saved {} rooms to {}", rooms, path.display());
    Ok(())
}

/// Spawn a background task that periodically saves the store
pub fn spawn_snapshot_saver(
    store: Arc<MemoryStore>,
    path: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; nothing new to save yet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = save(&store, &path).await {
                tracing::error!("Snapshot save failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;
    use crate::types::{PlayerSlot, Room};

    #[tokio::test]
    async fn test_restore_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new("test");
        let restored = restore(&store, &dir.path().join("none.json")).await.unwrap();
        assert!(!restored);
    }

    #[tokio::test]
    async fn test_save_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");

        let store = MemoryStore::new("test");
        store
            .insert_room(Room::new(
                "AB12CD".to_string(),
                PlayerSlot::new("p1".to_string(), "Alice".to_string()),
            ))
            .await
            .unwrap();
        save(&store, &path).await.unwrap();

        let fresh = MemoryStore::new("test");
        assert!(restore(&fresh, &path).await.unwrap());
        let room = fresh.get_room("AB12CD").await.unwrap().unwrap();
        assert_eq!(room.player1.unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn test_saver_writes_periodically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        let store = Arc::new(MemoryStore::new("test"));

        let handle = spawn_snapshot_saver(store, path.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert!(StoreSnapshot::load_from_file(&path).is_ok());
    }
}
