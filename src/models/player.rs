use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;

pub const STARTING_ELO: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub elo: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_played: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            elo: STARTING_ELO,
            wins: 0,
            losses: 0,
            draws: 0,
            games_played: 0,
        }
    }
}

impl PlayerStats {
    /// Applies a delta, flooring the rating at 0.
    pub fn apply(&mut self, delta: &StatsDelta) {
        self.elo = self.elo.saturating_add_signed(delta.elo);
        self.wins += delta.wins;
        self.losses += delta.losses;
        self.draws += delta.draws;
        self.games_played += 1;
    }
}

/// Snapshot of a player handed to the lobby. The user store owns the real record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    #[serde(default)]
    pub stats: PlayerStats,
    #[serde(default)]
    pub coins: u32,
}

impl Player {
    pub fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            stats: PlayerStats::default(),
            coins: 20,
        }
    }
}

/// Change to a player's record produced by one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    pub elo: i32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}
