use crate::game::rules::{resolve_round, RuleOrder};
use crate::logger;
use crate::models::card::{Card, CardId};
use crate::models::deck::{is_valid_deck_size, DECK_SIZE};
use crate::models::outcome::{BattleOutcome, MatchResult, RatingChange, RoundRecord, RoundResult};
use crate::models::player::{PlayerId, StatsDelta};
use crate::utils::errors::BattleError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// A match always pairs every card of both decks exactly once.
pub const ROUNDS: usize = DECK_SIZE;

pub const WIN_ELO: i32 = 3;
pub const LOSS_ELO: i32 = -5;
pub const DRAW_HIGHER_ELO: i32 = -2;
pub const DRAW_LOWER_ELO: i32 = 1;

/// Everything the engine needs to know about one side of a match.
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: PlayerId,
    pub name: String,
    pub rating: u32,
    pub deck: Vec<Card>,
}

/// Runs a full match between two decks.
///
/// Both decks are shuffled independently and paired slot by slot. The
/// function only computes: card transfers and rating changes are returned in
/// the outcome and applied by the caller.
///
/// # Arguments
/// * `first` / `second` - Both sides, with the ratings the deltas are computed from.
/// * `order` - Which rule family is applied first in every round.
/// * `rng` - Source for the deck shuffles.
///
/// # Returns
/// * `Ok(BattleOutcome)` - Rounds, result, cards to transfer and rating changes.
///
/// # Errors
/// * `BattleError::InvalidDeckSize` - a deck does not hold exactly four cards.
/// * `BattleError::RoundCountMismatch` - the match did not run exactly four rounds.
pub fn run_match<R: Rng + ?Sized>(
    first: &Combatant,
    second: &Combatant,
    order: RuleOrder,
    rng: &mut R,
) -> Result<BattleOutcome, BattleError> {
    check_deck(first)?;
    check_deck(second)?;

    let mut first_deck = first.deck.clone();
    let mut second_deck = second.deck.clone();
    first_deck.shuffle(rng);
    second_deck.shuffle(rng);

    let mut rounds = Vec::with_capacity(ROUNDS);
    let mut rounds_won = [0usize; 2];
    let mut defeated: [Vec<CardId>; 2] = [Vec::new(), Vec::new()];

    for (index, (one, two)) in first_deck.iter().zip(second_deck.iter()).enumerate() {
        let resolution = resolve_round(one, two, order);
        let lost = match resolution.result {
            RoundResult::FirstWins => {
                rounds_won[0] += 1;
                defeated[1].push(two.id);
                Some(two.id)
            }
            RoundResult::SecondWins => {
                rounds_won[1] += 1;
                defeated[0].push(one.id);
                Some(one.id)
            }
            RoundResult::Draw => None,
        };

        logger!(
            DEBUG,
            "[BATTLE] Round {}: {} ({}) vs {} ({}) => {:?}",
            index + 1,
            one.name,
            resolution.first_damage,
            two.name,
            resolution.second_damage,
            resolution.result
        );

        rounds.push(RoundRecord {
            round: index + 1,
            first: one.clone(),
            second: two.clone(),
            first_damage: resolution.first_damage,
            second_damage: resolution.second_damage,
            result: resolution.result,
            defeated: lost,
            notes: resolution.notes,
        });
    }

    if rounds.len() != ROUNDS {
        return Err(BattleError::RoundCountMismatch {
            expected: ROUNDS,
            actual: rounds.len(),
        });
    }

    let result = match rounds_won[0].cmp(&rounds_won[1]) {
        Ordering::Greater => MatchResult::Victory { winner: first.id, loser: second.id },
        Ordering::Less => MatchResult::Victory { winner: second.id, loser: first.id },
        Ordering::Equal => MatchResult::Draw,
    };

    let transfers = match result {
        MatchResult::Victory { loser, .. } if loser == second.id => std::mem::take(&mut defeated[1]),
        MatchResult::Victory { .. } => std::mem::take(&mut defeated[0]),
        MatchResult::Draw => Vec::new(),
    };

    Ok(BattleOutcome {
        first: first.id,
        second: second.id,
        first_name: first.name.clone(),
        second_name: second.name.clone(),
        result,
        rounds_won,
        rounds,
        transfers,
        rating_changes: rating_changes(result, (first.id, first.rating), (second.id, second.rating)),
    })
}

fn check_deck(combatant: &Combatant) -> Result<(), BattleError> {
    if !is_valid_deck_size(combatant.deck.len()) {
        return Err(BattleError::InvalidDeckSize {
            player: combatant.id,
            size: combatant.deck.len(),
        });
    }
    Ok(())
}

/// Rating and counter changes for both players. Losses never take a rating below 0.
///
/// # Arguments
/// * `result` - How the match ended.
/// * `(first, first_rating)` / `(second, second_rating)` - Each player and their rating before the match.
///
/// # Returns
/// One `RatingChange` per player; both get one even when the rating does not move.
pub fn rating_changes(
    result: MatchResult,
    (first, first_rating): (PlayerId, u32),
    (second, second_rating): (PlayerId, u32),
) -> Vec<RatingChange> {
    let rating_of = |player: PlayerId| if player == first { first_rating } else { second_rating };

    match result {
        MatchResult::Victory { winner, loser } => vec![
            RatingChange {
                player: winner,
                delta: StatsDelta { elo: WIN_ELO, wins: 1, ..StatsDelta::default() },
            },
            RatingChange {
                player: loser,
                delta: StatsDelta {
                    elo: floored(rating_of(loser), LOSS_ELO),
                    losses: 1,
                    ..StatsDelta::default()
                },
            },
        ],
        MatchResult::Draw => {
            let (first_elo, second_elo) = match first_rating.cmp(&second_rating) {
                Ordering::Greater => (floored(first_rating, DRAW_HIGHER_ELO), DRAW_LOWER_ELO),
                Ordering::Less => (DRAW_LOWER_ELO, floored(second_rating, DRAW_HIGHER_ELO)),
                Ordering::Equal => (0, 0),
            };
            vec![
                RatingChange {
                    player: first,
                    delta: StatsDelta { elo: first_elo, draws: 1, ..StatsDelta::default() },
                },
                RatingChange {
                    player: second,
                    delta: StatsDelta { elo: second_elo, draws: 1, ..StatsDelta::default() },
                },
            ]
        }
    }
}

fn floored(rating: u32, delta: i32) -> i32 {
    (delta as i64).max(-(rating as i64)) as i32
}
