pub mod engine;
pub mod lobby;
pub mod rules;
pub mod service;
