use super::*;
use crate::store::{MessagesListener, RoomListener};

impl RoomSession {
    /// Post a chat message to the current room
    pub async fn send_message(&self, text: &str) -> SessionResult<ChatMessage> {
        let text = required("a message", text)?;
        let code = self.current_code()?;
        let sender_name = self.display_name()?;

        let message = self
            .store
            .add_message(
                &code,
                NewMessage {
                    sender_id: self.identity.id.clone(),
                    sender_name,
                    text,
                },
            )
            .await
            .map_err(|e| {
                tracing::error!(room = %code, "Failed to send message: {}", e);
                SessionError::from(e)
            })?;
        tracing::debug!(room = %code, message = %message.id, "Message sent");
        Ok(message)
    }

    /// Keeps the local room and the client's view in step with the store.
    /// Snapshots for a room we've since left are ignored.
    pub(super) fn room_listener(&self, code: RoomCode) -> RoomListener {
        let local = Arc::clone(&self.local);
        let outbound = self.outbound.clone();
        let notifier = self.notifier.clone();
        let me = self.identity.id.clone();

        Box::new(move |snapshot: Option<Room>| {
            let mut state = lock(&local);
            if state.room_code.as_deref() != Some(code.as_str()) {
                return;
            }

            match snapshot {
                Some(room) => {
                    let view = PlayerView::project(&room, &me);
                    state.room = Some(room);
                    drop(state);
                    let _ = outbound.send(ServerMessage::RoomState { view: Some(view) });
                }
                None => {
                    *state = LocalState::lobby();
                    drop(state);
                    tracing::info!(room = %code, player = %me, "Room disappeared, back to lobby");
                    let _ = outbound.send(ServerMessage::RoomState { view: None });
                    let _ = outbound.send(ServerMessage::Messages { list: Vec::new() });
                    notifier.error("The room no longer exists");
                }
            }
        })
    }

    pub(super) fn messages_listener(&self, code: RoomCode) -> MessagesListener {
        let local = Arc::clone(&self.local);
        let outbound = self.outbound.clone();

        Box::new(move |list: Vec<ChatMessage>| {
            let mut state = lock(&local);
            if state.room_code.as_deref() != Some(code.as_str()) {
                return;
            }
            state.messages = list.clone();
            drop(state);
            let _ = outbound.send(ServerMessage::Messages { list });
        })
    }
}
