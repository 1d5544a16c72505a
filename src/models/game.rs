use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::utils::same_address;

// ==================== GAME ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub player1: String,
    pub player2: Option<String>,
    pub started: bool,
    pub finished: bool,
    pub current_round: u64,
    pub player1_score: u64,
    pub player2_score: u64,
    pub winner: Option<String>,
}

impl GameState {
    pub fn has_opponent(&self) -> bool {
        self.player2.is_some()
    }

    pub fn is_participant(&self, address: &str) -> bool {
        same_address(&self.player1, address)
            || self
                .player2
                .as_deref()
                .is_some_and(|p2| same_address(p2, address))
    }

    /// Open for a stranger to join: no opponent yet, not finished, not ours.
    pub fn is_joinable_by(&self, viewer: &str) -> bool {
        !self.finished && !self.has_opponent() && !same_address(&self.player1, viewer)
    }

    pub fn is_active_for(&self, viewer: &str) -> bool {
        !self.finished && self.is_participant(viewer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameListing {
    pub game_id: String,
    pub game_state: GameState,
}

// ==================== ROUND ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    pub round_number: u64,
    pub shooter: String,
    pub keeper: String,
    pub shoot_submitted: bool,
    pub keep_submitted: bool,
}

impl RoundInfo {
    pub fn role_of(&self, address: &str) -> Option<Role> {
        if same_address(&self.shooter, address) {
            Some(Role::Shooter)
        } else if same_address(&self.keeper, address) {
            Some(Role::Keeper)
        } else {
            None
        }
    }

    pub fn has_submitted(&self, role: Role) -> bool {
        match role {
            Role::Shooter => self.shoot_submitted,
            Role::Keeper => self.keep_submitted,
        }
    }

    /// Both moves are in and the round is waiting to be scored.
    pub fn awaiting_resolution(&self) -> bool {
        self.shoot_submitted && self.keep_submitted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Shooter,
    Keeper,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTurn {
    pub is_my_turn: bool,
    pub current_player: Option<String>,
}

// ==================== DIRECTION ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Center,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Left, Direction::Center, Direction::Right];

    pub fn code(self) -> u8 {
        match self {
            Direction::Left => 0,
            Direction::Center => 1,
            Direction::Right => 2,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = AppError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Direction::Left),
            1 => Ok(Direction::Center),
            2 => Ok(Direction::Right),
            other => Err(AppError::BadRequest(format!(
                "Unknown direction code {other}"
            ))),
        }
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "0" => Ok(Direction::Left),
            "center" | "centre" | "c" | "1" => Ok(Direction::Center),
            "right" | "r" | "2" => Ok(Direction::Right),
            other => Err(AppError::BadRequest(format!("Unknown direction '{other}'"))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Left => "left",
            Direction::Center => "center",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}
