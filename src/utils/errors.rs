use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the card, user and battle-log collaborators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Player `{0}` was not found")]
    PlayerNotFound(Uuid),
    #[error("Card `{0}` was not found")]
    CardNotFound(Uuid),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),
    #[error("Invalid response body, expected {0}")]
    InvalidResponseBody(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            StoreError::InvalidResponseBody(error.to_string())
        } else {
            StoreError::Unavailable(error.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("Player `{player}` does not have a valid deck of exactly 4 cards (found {size})")]
    InvalidDeck { player: Uuid, size: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum BattleError {
    #[error("Deck of `{player}` holds {size} cards, a battle needs exactly 4")]
    InvalidDeckSize { player: Uuid, size: usize },
    #[error("Match ran {actual} rounds instead of {expected}")]
    RoundCountMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BattleError {
    /// Contract and protocol violations point at an engine bug and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BattleError::InvalidDeckSize { .. } | BattleError::RoundCountMismatch { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unable to read settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
