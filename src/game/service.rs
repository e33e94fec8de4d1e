use crate::game::engine::{run_match, Combatant};
use crate::game::rules::RuleOrder;
use crate::logger;
use crate::models::outcome::{BattleOutcome, MatchResult};
use crate::models::player::Player;
use crate::store::{BattleLog, CardStore, UserStore};
use crate::utils::errors::{BattleError, StoreError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Runs one match end to end: reads both decks and ratings, fights, then
/// pushes transfers, stats and the battle log back to the collaborators.
pub struct BattleService {
    cards: Arc<dyn CardStore>,
    users: Arc<dyn UserStore>,
    battle_log: Arc<dyn BattleLog>,
    order: RuleOrder,
}

impl BattleService {
    pub fn new(
        cards: Arc<dyn CardStore>,
        users: Arc<dyn UserStore>,
        battle_log: Arc<dyn BattleLog>,
        order: RuleOrder,
    ) -> Self {
        Self { cards, users, battle_log, order }
    }

    /// Runs one match end to end.
    ///
    /// # Arguments
    /// * `first` - The player dealt the first seat of every round.
    /// * `second` - The opponent.
    ///
    /// # Returns
    /// * `Ok(BattleOutcome)` - The match was fought and its results were written back.
    /// * `Err(BattleError)` - A deck broke the engine contract or a collaborator failed.
    pub async fn run_battle(&self, first: &Player, second: &Player) -> Result<BattleOutcome, BattleError> {
        let outcome = self.fight(first, second).await?;
        self.settle(outcome).await
    }

    /// Reads both decks and ratings and computes the match. Nothing is written,
    /// so the future can be dropped at any point.
    ///
    /// # Returns
    /// * `Ok(BattleOutcome)` - The computed outcome, not yet applied.
    /// * `Err(BattleError)` - A deck or rating could not be read, or a deck is not four cards.
    pub async fn fight(&self, first: &Player, second: &Player) -> Result<BattleOutcome, BattleError> {
        logger!(INFO, "[BATTLE] `{}` vs `{}`", first.username, second.username);

        let first_side = self.combatant(first).await?;
        let second_side = self.combatant(second).await?;

        let mut rng = StdRng::from_entropy();
        run_match(&first_side, &second_side, self.order, &mut rng)
    }

    /// Writes card transfers, refills and stats for a computed outcome, then
    /// the battle log. Callers must let this run to completion.
    ///
    /// # Arguments
    /// * `outcome` - An outcome produced by `fight`.
    ///
    /// # Returns
    /// * `Ok(BattleOutcome)` - The outcome, now applied.
    /// * `Err(BattleError::Store)` - A collaborator write failed.
    pub async fn settle(&self, outcome: BattleOutcome) -> Result<BattleOutcome, BattleError> {
        self.apply(&outcome).await?;
        self.record(&outcome).await;

        match outcome.result {
            MatchResult::Victory { winner, .. } => {
                let name = if winner == outcome.first { &outcome.first_name } else { &outcome.second_name };
                logger!(
                    INFO,
                    "[BATTLE] `{name}` won {}-{}, {} cards change hands",
                    outcome.rounds_won[0].max(outcome.rounds_won[1]),
                    outcome.rounds_won[0].min(outcome.rounds_won[1]),
                    outcome.transfers.len()
                );
            }
            MatchResult::Draw => logger!(
                INFO,
                "[BATTLE] `{}` and `{}` drew",
                outcome.first_name,
                outcome.second_name
            ),
        }

        Ok(outcome)
    }

    async fn combatant(&self, player: &Player) -> Result<Combatant, StoreError> {
        let deck = self.cards.get_deck(player.id).await?;
        let rating = self.users.get_rating(player.id).await?;
        Ok(Combatant {
            id: player.id,
            name: player.username.clone(),
            rating,
            deck,
        })
    }

    async fn apply(&self, outcome: &BattleOutcome) -> Result<(), StoreError> {
        if let MatchResult::Victory { winner, loser } = outcome.result {
            for card in &outcome.transfers {
                self.cards.remove_card_from_deck(loser, *card).await?;
                self.cards.transfer_card_ownership(*card, winner).await?;
            }
            if !outcome.transfers.is_empty() {
                self.cards.refill_deck(loser).await?;
            }
        }

        for change in &outcome.rating_changes {
            self.users.update_stats(change.player, &change.delta).await?;
        }
        Ok(())
    }

    async fn record(&self, outcome: &BattleOutcome) {
        if let Err(error) = self.battle_log.append(outcome).await {
            logger!(WARN, "[BATTLE] Could not write battle log ({error})");
        }
    }
}
