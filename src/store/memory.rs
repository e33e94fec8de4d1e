use crate::models::card::{Card, CardId};
use crate::models::deck::DECK_SIZE;
use crate::models::player::{Player, PlayerId, StatsDelta};
use crate::store::{CardStore, UserStore};
use crate::utils::errors::StoreError;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct OwnedCard {
    card: Card,
    owner: PlayerId,
}

/// In-process card and user store.
#[derive(Default)]
pub struct MemoryStore {
    players: RwLock<HashMap<PlayerId, Player>>,
    cards: RwLock<HashMap<CardId, OwnedCard>>,
    decks: RwLock<HashMap<PlayerId, Vec<CardId>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_player(&self, player: Player) {
        self.players.write().await.insert(player.id, player);
    }

    /// Gives `cards` to `owner` without placing them in the deck.
    pub async fn add_cards(&self, owner: PlayerId, cards: Vec<Card>) {
        let mut guard = self.cards.write().await;
        for card in cards {
            guard.insert(card.id, OwnedCard { card, owner });
        }
    }

    /// Gives `cards` to `owner` and makes them the player's deck.
    pub async fn set_deck(&self, owner: PlayerId, cards: Vec<Card>) {
        let ids = cards.iter().map(|card| card.id).collect();
        self.add_cards(owner, cards).await;
        self.decks.write().await.insert(owner, ids);
    }

    pub async fn owned_cards(&self, owner: PlayerId) -> Vec<CardId> {
        self.cards
            .read()
            .await
            .values()
            .filter(|owned| owned.owner == owner)
            .map(|owned| owned.card.id)
            .collect()
    }

    pub async fn deck_ids(&self, player: PlayerId) -> Vec<CardId> {
        self.decks.read().await.get(&player).cloned().unwrap_or_default()
    }

    async fn ensure_player(&self, player: PlayerId) -> Result<(), StoreError> {
        if self.players.read().await.contains_key(&player) {
            Ok(())
        } else {
            Err(StoreError::PlayerNotFound(player))
        }
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn get_deck(&self, player: PlayerId) -> Result<Vec<Card>, StoreError> {
        self.ensure_player(player).await?;
        let deck = self.deck_ids(player).await;
        let cards = self.cards.read().await;

        deck.iter()
            .map(|id| {
                cards
                    .get(id)
                    .map(|owned| owned.card.clone())
                    .ok_or(StoreError::CardNotFound(*id))
            })
            .collect()
    }

    async fn get_deck_size(&self, player: PlayerId) -> Result<usize, StoreError> {
        self.ensure_player(player).await?;
        Ok(self.deck_ids(player).await.len())
    }

    async fn transfer_card_ownership(&self, card: CardId, new_owner: PlayerId) -> Result<(), StoreError> {
        self.ensure_player(new_owner).await?;
        let mut cards = self.cards.write().await;
        let owned = cards.get_mut(&card).ok_or(StoreError::CardNotFound(card))?;
        owned.owner = new_owner;
        Ok(())
    }

    async fn remove_card_from_deck(&self, player: PlayerId, card: CardId) -> Result<(), StoreError> {
        self.ensure_player(player).await?;
        if let Some(deck) = self.decks.write().await.get_mut(&player) {
            deck.retain(|id| *id != card);
        }
        Ok(())
    }

    async fn refill_deck(&self, player: PlayerId) -> Result<(), StoreError> {
        self.ensure_player(player).await?;
        let cards = self.cards.read().await;
        let mut decks = self.decks.write().await;
        let deck = decks.entry(player).or_default();

        let mut candidates: Vec<CardId> = cards
            .values()
            .filter(|owned| owned.owner == player && !deck.contains(&owned.card.id))
            .map(|owned| owned.card.id)
            .collect();
        candidates.shuffle(&mut rand::thread_rng());

        let missing = DECK_SIZE.saturating_sub(deck.len());
        deck.extend(candidates.into_iter().take(missing));
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_player(&self, player: PlayerId) -> Result<Player, StoreError> {
        self.players
            .read()
            .await
            .get(&player)
            .cloned()
            .ok_or(StoreError::PlayerNotFound(player))
    }

    async fn get_rating(&self, player: PlayerId) -> Result<u32, StoreError> {
        Ok(self.get_player(player).await?.stats.elo)
    }

    async fn update_stats(&self, player: PlayerId, delta: &StatsDelta) -> Result<(), StoreError> {
        let mut players = self.players.write().await;
        let record = players.get_mut(&player).ok_or(StoreError::PlayerNotFound(player))?;
        record.stats.apply(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::card::Element;

    fn cards(count: usize) -> Vec<Card> {
        (0..count)
            .map(|i| Card::spell("RegularSpell", (i * 10) as f64, Element::Normal))
            .collect()
    }

    async fn store_with_player() -> (MemoryStore, Player) {
        let store = MemoryStore::new();
        let player = Player::new("kienboec");
        store.add_player(player.clone()).await;
        (store, player)
    }

    #[tokio::test]
    async fn test_deck_roundtrip() {
        let (store, player) = store_with_player().await;
        let deck = cards(4);
        store.set_deck(player.id, deck.clone()).await;

        assert_eq!(store.get_deck_size(player.id).await.unwrap(), 4);
        assert_eq!(store.get_deck(player.id).await.unwrap(), deck);
    }

    #[tokio::test]
    async fn test_unknown_player_is_reported() {
        let store = MemoryStore::new();
        let id = PlayerId::new_v4();

        assert_eq!(store.get_deck_size(id).await, Err(StoreError::PlayerNotFound(id)));
        assert_eq!(store.get_rating(id).await, Err(StoreError::PlayerNotFound(id)));
    }

    #[tokio::test]
    async fn test_refill_takes_from_owned_cards() {
        let (store, player) = store_with_player().await;
        let deck = cards(4);
        let spare = cards(2);
        let removed = deck[0].id;
        store.set_deck(player.id, deck).await;
        store.add_cards(player.id, spare.clone()).await;

        store.remove_card_from_deck(player.id, removed).await.unwrap();
        assert_eq!(store.get_deck_size(player.id).await.unwrap(), 3);

        store.refill_deck(player.id).await.unwrap();
        let ids = store.deck_ids(player.id).await;
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().any(|id| spare.iter().any(|card| card.id == *id)));
    }

    #[tokio::test]
    async fn test_refill_without_spares_leaves_gap() {
        let (store, player) = store_with_player().await;
        let winner = Player::new("altenhof");
        store.add_player(winner.clone()).await;
        let deck = cards(4);
        let lost = deck[1].id;
        store.set_deck(player.id, deck).await;

        store.remove_card_from_deck(player.id, lost).await.unwrap();
        store.transfer_card_ownership(lost, winner.id).await.unwrap();
        store.refill_deck(player.id).await.unwrap();

        assert_eq!(store.get_deck_size(player.id).await.unwrap(), 3);
        assert!(!store.deck_ids(player.id).await.contains(&lost));
    }

    #[tokio::test]
    async fn test_refill_puts_back_a_card_still_owned() {
        let (store, player) = store_with_player().await;
        let deck = cards(4);
        let removed = deck[3].id;
        store.set_deck(player.id, deck).await;

        store.remove_card_from_deck(player.id, removed).await.unwrap();
        store.refill_deck(player.id).await.unwrap();

        assert_eq!(store.get_deck_size(player.id).await.unwrap(), 4);
        assert!(store.deck_ids(player.id).await.contains(&removed));
    }

    #[tokio::test]
    async fn test_transfer_changes_owner() {
        let (store, giver) = store_with_player().await;
        let taker = Player::new("altenhof");
        store.add_player(taker.clone()).await;
        let deck = cards(4);
        let card = deck[2].id;
        store.set_deck(giver.id, deck).await;

        store.transfer_card_ownership(card, taker.id).await.unwrap();
        assert_eq!(store.owned_cards(taker.id).await, vec![card]);
        assert_eq!(store.owned_cards(giver.id).await.len(), 3);
    }

    #[tokio::test]
    async fn test_update_stats_floors_rating() {
        let (store, player) = store_with_player().await;
        store
            .update_stats(player.id, &StatsDelta { elo: -500, losses: 1, ..StatsDelta::default() })
            .await
            .unwrap();

        let stored = store.get_player(player.id).await.unwrap();
        assert_eq!(stored.stats.elo, 0);
        assert_eq!(stored.stats.losses, 1);
    }
}
