//! WebSocket message dispatch
//!
//! Each client message maps onto one session operation. Outcomes are reported
//! as auto-dismissing notices; room and chat updates reach the client through
//! the session's own subscriptions.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{GuessOutcome, JoinOutcome, RoomSession, SessionError};
use std::sync::Arc;

/// Handle client messages and return optional response
pub async fn handle_message(msg: ClientMessage, session: &Arc<RoomSession>) -> Option<ServerMessage> {
    let notifier = session.notifier();

    match msg {
        ClientMessage::CreateRoom { display_name } => match session.create_room(&display_name).await {
            Ok(room) => {
                notifier.success(format!("Room created! Share the code {}", room.code));
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::JoinRoom {
            room_code,
            display_name,
        } => match session.join_room(&room_code, &display_name).await {
            Ok(JoinOutcome::Joined(room)) => {
                notifier.success(format!("Joined room {}", room.code));
                None
            }
            Ok(JoinOutcome::AlreadyInRoom(room)) => {
                notifier.info(format!("You are already in room {}", room.code));
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::StartRound => match session.start_round().await {
            Ok(_) => {
                notifier.success("New round! Guess your opponent's image");
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::ChangeImages => match session.change_images().await {
            Ok(_) => {
                notifier.info("Images changed");
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::Guess { text } => match session.guess(&text).await {
            Ok(GuessOutcome::Correct(_)) => {
                notifier.success("Correct guess! You won this round");
                Some(ServerMessage::GuessResult { correct: true })
            }
            Ok(GuessOutcome::Incorrect) => {
                notifier.error("Wrong guess, try again!");
                Some(ServerMessage::GuessResult { correct: false })
            }
            Ok(GuessOutcome::NoActiveRound) => {
                notifier.info("There is no round in progress");
                Some(ServerMessage::GuessResult { correct: false })
            }
            Err(e) => report(session, e),
        },

        ClientMessage::EndRound => match session.end_round().await {
            Ok(_) => {
                notifier.info("Round ended");
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::LeaveRoom => match session.leave_room().await {
            Ok(()) => {
                notifier.info("You left the room");
                None
            }
            Err(e) => report(session, e),
        },

        ClientMessage::SendMessage { text } => match session.send_message(&text).await {
            Ok(_) => None,
            Err(e) => report(session, e),
        },
    }
}

/// Surface a failed operation as an error notice
fn report(session: &RoomSession, err: SessionError) -> Option<ServerMessage> {
    tracing::warn!(player = %session.player_id(), code = err.code(), "Operation failed: {}", err);
    session.notifier().error(err.to_string());
    None
}
