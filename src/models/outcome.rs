use crate::models::card::{Card, CardId};
use crate::models::player::{PlayerId, StatsDelta};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    FirstWins,
    SecondWins,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Victory { winner: PlayerId, loser: PlayerId },
    Draw,
}

/// One card-vs-card comparison as it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    pub first: Card,
    pub second: Card,
    pub first_damage: f64,
    pub second_damage: f64,
    pub result: RoundResult,
    pub defeated: Option<CardId>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub player: PlayerId,
    pub delta: StatsDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub first: PlayerId,
    pub second: PlayerId,
    pub first_name: String,
    pub second_name: String,
    pub result: MatchResult,
    pub rounds_won: [usize; 2],
    pub rounds: Vec<RoundRecord>,
    /// Cards the loser lost in a round; they change owner to the winner.
    pub transfers: Vec<CardId>,
    pub rating_changes: Vec<RatingChange>,
}

impl BattleOutcome {
    pub fn winner(&self) -> Option<PlayerId> {
        match self.result {
            MatchResult::Victory { winner, .. } => Some(winner),
            MatchResult::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.result == MatchResult::Draw
    }

    pub fn rating_change(&self, player: PlayerId) -> Option<&StatsDelta> {
        self.rating_changes
            .iter()
            .find(|change| change.player == player)
            .map(|change| &change.delta)
    }

    /// Renders the round-by-round log shown to players and written to the battle log.
    pub fn log_text(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "Battle: {} vs {}", self.first_name, self.second_name);

        for round in &self.rounds {
            let _ = write!(
                text,
                "Round {}: {} ({}) vs {} ({})",
                round.round,
                round.first.name,
                round.first_damage,
                round.second.name,
                round.second_damage
            );
            for note in &round.notes {
                let _ = write!(text, " | {note}");
            }
            let _ = match round.result {
                RoundResult::FirstWins => writeln!(text, " => {} wins", round.first.name),
                RoundResult::SecondWins => writeln!(text, " => {} wins", round.second.name),
                RoundResult::Draw => writeln!(text, " => Draw"),
            };
        }

        let _ = match self.result {
            MatchResult::Victory { winner, .. } => {
                let name = if winner == self.first { &self.first_name } else { &self.second_name };
                writeln!(
                    text,
                    "Result: {name} wins {}-{}",
                    self.rounds_won[0].max(self.rounds_won[1]),
                    self.rounds_won[0].min(self.rounds_won[1])
                )
            }
            MatchResult::Draw => writeln!(
                text,
                "Result: Draw {}-{}",
                self.rounds_won[0], self.rounds_won[1]
            ),
        };

        text
    }
}
