pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::identity::provider_for;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Auth token for a durable identity; absent for anonymous play
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: authenticated={}",
        params.token.is_some()
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

fn to_frame(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let identity = provider_for(params.token.as_deref()).identify();
    let player_id = identity.id.clone();
    tracing::info!(player = %player_id, durable = identity.durable, "WebSocket connected");

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        player_id: player_id.clone(),
        durable: identity.durable,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Some(frame) = to_frame(&welcome) {
        if sender.send(frame).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    // Everything for this client (pushes, notices, replies) goes through one queue
    let (tx, mut outbound) = mpsc::unbounded_channel::<ServerMessage>();
    let session = Arc::new(state.session(identity, tx.clone()));

    loop {
        tokio::select! {
            Some(msg) = outbound.recv() => {
                if let Some(frame) = to_frame(&msg) {
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(player = %player_id, "Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) if client_msg.is_slow() => {
                                // Image generation takes seconds; keep chat flowing meanwhile
                                let session = session.clone();
                                let tx = tx.clone();
                                tokio::spawn(async move {
                                    if let Some(response) =
                                        handlers::handle_message(client_msg, &session).await
                                    {
                                        let _ = tx.send(response);
                                    }
                                });
                            }
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &session).await
                                {
                                    let _ = tx.send(response);
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let _ = tx.send(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                });
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(player = %player_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // A closed tab gives up its seat
    if let Err(e) = session.leave_room().await {
        tracing::warn!(player = %player_id, "Failed to leave room on disconnect: {}", e);
    }
    tracing::info!(player = %player_id, "WebSocket connection closed");
}
