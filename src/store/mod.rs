//! Narrow contracts through which the battle core reads decks and ratings and
//! hands back card transfers, stat changes and finished battle logs.

pub mod battle_log;
pub mod memory;
pub mod remote;

use crate::models::card::{Card, CardId};
use crate::models::outcome::BattleOutcome;
use crate::models::player::{Player, PlayerId, StatsDelta};
use crate::utils::errors::StoreError;
use async_trait::async_trait;

#[async_trait]
pub trait CardStore: Send + Sync {
    /// Fetches the cards a player has placed in their deck.
    ///
    /// # Arguments
    /// * `player` - The deck's owner.
    ///
    /// # Returns
    /// * `Ok(Vec<Card>)` - The deck, in stored order.
    /// * `Err(StoreError::PlayerNotFound)` - The player is unknown.
    /// * `Err(StoreError)` - The store could not be reached or answered badly.
    async fn get_deck(&self, player: PlayerId) -> Result<Vec<Card>, StoreError>;

    /// Counts the cards in a player's deck without fetching them.
    ///
    /// # Returns
    /// * `Ok(usize)` - The number of cards in the deck.
    /// * `Err(StoreError::PlayerNotFound)` - The player is unknown.
    async fn get_deck_size(&self, player: PlayerId) -> Result<usize, StoreError>;

    /// Hands `card` to `new_owner`. The card leaves no deck slot behind; call
    /// `remove_card_from_deck` first.
    ///
    /// # Arguments
    /// * `card` - The card changing hands.
    /// * `new_owner` - The player receiving it.
    ///
    /// # Returns
    /// * `Ok(())` - The card now belongs to `new_owner`.
    /// * `Err(StoreError::CardNotFound)` / `Err(StoreError::PlayerNotFound)` - Either side is unknown.
    async fn transfer_card_ownership(&self, card: CardId, new_owner: PlayerId) -> Result<(), StoreError>;

    /// Clears the deck slot holding `card`. Removing a card that is not in the deck is a no-op.
    ///
    /// # Returns
    /// * `Ok(())` - The card is no longer in the player's deck.
    /// * `Err(StoreError)` - The player is unknown or the store failed.
    async fn remove_card_from_deck(&self, player: PlayerId, card: CardId) -> Result<(), StoreError>;

    /// Fills free deck slots with random cards the player owns but has not placed in the deck.
    ///
    /// # Returns
    /// * `Ok(())` - The deck holds four cards, or every owned card is already in it.
    /// * `Err(StoreError)` - The player is unknown or the store failed.
    async fn refill_deck(&self, player: PlayerId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_player(&self, player: PlayerId) -> Result<Player, StoreError>;
    async fn get_rating(&self, player: PlayerId) -> Result<u32, StoreError>;

    /// Applies one match's changes to a player's record.
    ///
    /// # Arguments
    /// * `player` - Whose record changes.
    /// * `delta` - Rating and counter changes; `games_played` goes up by one.
    ///
    /// # Returns
    /// * `Ok(())` - The delta was applied, with the rating floored at 0.
    /// * `Err(StoreError)` - The player is unknown or the store failed.
    async fn update_stats(&self, player: PlayerId, delta: &StatsDelta) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BattleLog: Send + Sync {
    /// Persists a finished match. Failures are reported, never retried here.
    async fn append(&self, outcome: &BattleOutcome) -> Result<(), StoreError>;
}
