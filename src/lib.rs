//! Matchmaking lobby and battle engine for the Monster Trading Cards Game.
//!
//! Players queue in the [`game::lobby::Lobby`]; pairs are fought by the
//! [`game::service::BattleService`] on their own tasks, and everything the
//! core needs from persistence goes through the traits in [`store`].

pub mod controller;
pub mod game;
pub mod models;
pub mod store;
pub mod utils;
