use crate::config::DEFAULT_APP_ID;
use crate::identity::Identity;
use crate::images::{ImageGenerator, PlaceholderProvider};
use crate::protocol::ServerMessage;
use crate::session::RoomSession;
use crate::store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub images: Arc<dyn ImageGenerator>,
    /// Per-request budget handed to the image generator
    pub image_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<MemoryStore>,
        images: Arc<dyn ImageGenerator>,
        image_timeout: Duration,
    ) -> Self {
        Self {
            store,
            images,
            image_timeout,
        }
    }

    /// Build a session controller for one connected client
    pub fn session(
        &self,
        identity: Identity,
        outbound: mpsc::UnboundedSender<ServerMessage>,
    ) -> RoomSession {
        RoomSession::new(
            self.store.clone(),
            self.images.clone(),
            identity,
            self.image_timeout,
            outbound,
        )
    }
}

impl Default for AppState {
    /// Empty store with offline images
    fn default() -> Self {
        Self::new(
            Arc::new(MemoryStore::new(DEFAULT_APP_ID)),
            Arc::new(PlaceholderProvider),
            Duration::from_secs(60),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Screen;

    #[tokio::test]
    async fn test_sessions_share_the_store() {
        let state = AppState::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let alice = state.session(
            Identity {
                id: "p1".to_string(),
                durable: false,
            },
            tx,
        );

        alice.create_room("Alice").await.unwrap();
        assert_eq!(alice.screen(), Screen::InRoom);
        assert_eq!(state.store.namespace(), "default-app-id");
    }
}
