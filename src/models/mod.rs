// src/models/mod.rs
pub mod game;

pub use game::{CurrentTurn, Direction, GameListing, GameState, Role, RoundInfo};
