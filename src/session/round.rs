use super::*;
use crate::images::ImageRequest;
use crate::prompts;
use crate::store::{RoomPatch, SlotAssignment};

#[derive(Debug, Clone)]
pub enum GuessOutcome {
    /// Guesser scored; carries the room after the win was recorded
    Correct(Room),
    Incorrect,
    /// Nothing to guess right now (no round, or the opponent has no prompt)
    NoActiveRound,
}

impl GuessOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, GuessOutcome::Correct(_))
    }
}

/// Case-insensitive containment of the prompt within the guess.
/// An empty prompt never matches.
pub fn is_correct_guess(guess: &str, prompt: &str) -> bool {
    let prompt = prompt.trim();
    !prompt.is_empty() && guess.to_lowercase().contains(&prompt.to_lowercase())
}

impl RoomSession {
    /// Give both players fresh images and open a round
    pub async fn start_round(&self) -> SessionResult<Room> {
        let room = self.assign_images().await?;
        tracing::info!(room = %room.code, "Round started");
        Ok(room)
    }

    /// Replace both images mid-round
    pub async fn change_images(&self) -> SessionResult<Room> {
        let room = self.assign_images().await?;
        tracing::info!(room = %room.code, "Images changed");
        Ok(room)
    }

    async fn assign_images(&self) -> SessionResult<Room> {
        let code = self.current_code()?;
        let room = self
            .store
            .get_room(&code)
            .await?
            .ok_or(SessionError::RoomNotFound)?;
        if !room.is_full() {
            return Err(SessionError::NotEnoughPlayers);
        }

        let (prompt1, prompt2) = prompts::pick_two_distinct();
        tracing::debug!(room = %code, provider = self.images.name(), "Requesting images");

        self.push(ServerMessage::Loading { active: true });
        let generated = futures::future::try_join(
            self.images.generate(ImageRequest {
                prompt: prompt1.to_string(),
                timeout: self.image_timeout,
            }),
            self.images.generate(ImageRequest {
                prompt: prompt2.to_string(),
                timeout: self.image_timeout,
            }),
        )
        .await;
        self.push(ServerMessage::Loading { active: false });

        let (image1, image2) = generated.map_err(|e| {
            tracing::error!(room = %code, "Image generation failed: {}", e);
            SessionError::ImageGenerationFailed(e.to_string())
        })?;
        tracing::debug!(
            room = %code,
            latency1_ms = image1.metadata.latency_ms,
            latency2_ms = image2.metadata.latency_ms,
            "Images generated"
        );

        let (stored, ()) = self
            .transact(&code, |room| {
                // Someone may have left while the images were generating
                if !room.is_full() {
                    return Err(SessionError::NotEnoughPlayers);
                }
                let mut next = room;
                RoomPatch {
                    player1_assignment: Some(SlotAssignment {
                        image: Some(image1.data_url.clone()),
                        prompt: Some(prompt1.to_string()),
                    }),
                    player2_assignment: Some(SlotAssignment {
                        image: Some(image2.data_url.clone()),
                        prompt: Some(prompt2.to_string()),
                    }),
                    round_active: Some(true),
                    ..Default::default()
                }
                .apply(&mut next);
                Ok(Step::Write(Some(next), ()))
            })
            .await?;

        stored.ok_or(SessionError::RoomNotFound)
    }

    /// Check a guess against the opponent's prompt; a hit scores one point
    /// and closes the round
    pub async fn guess(&self, text: &str) -> SessionResult<GuessOutcome> {
        let guess = required("your guess", text)?;
        let code = self.current_code()?;
        let me = self.identity.id.clone();

        let (room, outcome) = self
            .transact(&code, |room| {
                let seat = room.seat_of(&me).ok_or(SessionError::NoSuchPlayer)?;
                let target = room.slot(seat.other()).and_then(|p| p.prompt.clone());
                let Some(target) = target.filter(|_| room.round_active) else {
                    return Ok(Step::Keep(Some(GuessOutcome::NoActiveRound)));
                };
                if !is_correct_guess(&guess, &target) {
                    return Ok(Step::Keep(Some(GuessOutcome::Incorrect)));
                }

                let mut next = room;
                let winner = match next.slot_mut(seat) {
                    Some(slot) => {
                        slot.score += 1;
                        Winner {
                            id: slot.id.clone(),
                            name: slot.name.clone(),
                        }
                    }
                    None => return Err(SessionError::NoSuchPlayer),
                };
                next.round_active = false;
                next.last_winner = Some(winner);
                // Outcome is filled in from the stored room
                Ok(Step::Write(Some(next), None))
            })
            .await?;

        match outcome {
            Some(outcome) => Ok(outcome),
            None => {
                let room = room.ok_or(SessionError::RoomNotFound)?;
                tracing::info!(room = %code, player = %me, "Round won");
                Ok(GuessOutcome::Correct(room))
            }
        }
    }

    /// Clear both images and prompts and close the round
    pub async fn end_round(&self) -> SessionResult<Room> {
        let code = self.current_code()?;
        let room = self
            .store
            .update_room(
                &code,
                RoomPatch {
                    player1_assignment: Some(SlotAssignment::default()),
                    player2_assignment: Some(SlotAssignment::default()),
                    round_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                tracing::error!(room = %code, "Failed to end round: {}", e);
                SessionError::from(e)
            })?;
        tracing::info!(room = %code, "Round ended");
        Ok(room)
    }
}
