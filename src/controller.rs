use crate::game::lobby::{JoinOutcome, Lobby, MatchStatus};
use crate::logger;
use crate::models::player::PlayerId;
use crate::store::UserStore;
use crate::utils::errors::{LobbyError, StoreError};
use std::sync::Arc;

/// What the HTTP layer sends back for a battle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub message: String,
    pub body: Option<String>,
}

impl Reply {
    fn new(status: u16, message: &str) -> Self {
        Self { status, message: message.to_string(), body: None }
    }
}

pub const BATTLE_DONE: &str = "The battle has been carried out successfully.";
pub const WAITING: &str = "Joined the lobby, waiting for an opponent.";
pub const NOT_JOINED: &str = "Could not join the lobby";
pub const INVALID_DECK: &str = "Could not join the lobby - invalid deck";
pub const PLAYER_NOT_FOUND: &str = "Player not found";
pub const INTERNAL_ERROR: &str = "Internal Server Error";

/// Handles `POST /battles` on behalf of an authenticated player.
pub struct BattleController {
    users: Arc<dyn UserStore>,
    lobby: Arc<Lobby>,
}

impl BattleController {
    pub fn new(users: Arc<dyn UserStore>, lobby: Arc<Lobby>) -> Self {
        Self { users, lobby }
    }

    /// Joins the lobby and, if that completes a pair including the requester,
    /// waits for the match to finish before replying. The lobby's match
    /// timeout bounds the fight; writing its results back is always awaited.
    ///
    /// # Arguments
    /// * `player_id` - The authenticated requester.
    ///
    /// # Returns
    /// The `Reply` to send: 200 with the round log when the requester's match
    /// ran, 200 while waiting for an opponent, 409 when the player cannot join,
    /// 404 for an unknown player and 500 for anything else.
    pub async fn handle_battle_request(&self, player_id: PlayerId) -> Reply {
        let player = match self.users.get_player(player_id).await {
            Ok(player) => player,
            Err(StoreError::PlayerNotFound(_)) => return Reply::new(404, PLAYER_NOT_FOUND),
            Err(error) => {
                logger!(ERROR, "[CONTROLLER] Could not load player `{player_id}` ({error})");
                return Reply::new(500, INTERNAL_ERROR);
            }
        };

        match self.lobby.try_join(player).await {
            Ok(JoinOutcome::Joined) => {}
            Ok(JoinOutcome::AlreadyWaiting) | Ok(JoinOutcome::InBattle) => {
                return Reply::new(409, NOT_JOINED)
            }
            Err(LobbyError::InvalidDeck { .. }) => return Reply::new(409, INVALID_DECK),
            Err(LobbyError::Store(StoreError::PlayerNotFound(_))) => {
                return Reply::new(404, PLAYER_NOT_FOUND)
            }
            Err(error) => {
                logger!(ERROR, "[CONTROLLER] `{player_id}` could not join the lobby ({error})");
                return Reply::new(500, INTERNAL_ERROR);
            }
        }

        let ticket = match self.lobby.try_start_match().await {
            Some(ticket) if ticket.involves(player_id) => ticket,
            // Someone else's pair was dispatched; it reports on its own.
            _ => return Reply::new(200, WAITING),
        };

        let report = ticket.wait().await;
        match report.status {
            MatchStatus::Completed(outcome) => Reply {
                status: 200,
                message: BATTLE_DONE.to_string(),
                body: Some(outcome.log_text()),
            },
            status => {
                logger!(
                    ERROR,
                    "[CONTROLLER] Battle of `{player_id}` did not complete ({status:?})"
                );
                Reply::new(500, INTERNAL_ERROR)
            }
        }
    }
}
