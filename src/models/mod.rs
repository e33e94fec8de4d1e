pub mod card;
pub mod deck;
pub mod outcome;
pub mod player;
pub mod settings;
