// src/models/board.rs

//! Board records and their harvest status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Harvest status of a board.
///
/// Moves from `Pending` to `Harvested` once every listing page of the board
/// has been parsed and stored; only an explicit reset moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardStatus {
    Pending,
    Harvested,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardStatus::Pending => "PENDING",
            BoardStatus::Harvested => "HARVESTED",
        }
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BoardStatus::Pending),
            "HARVESTED" => Ok(BoardStatus::Harvested),
            other => Err(AppError::persistence(format!(
                "unknown board status '{other}'"
            ))),
        }
    }
}

/// A board (section) of the site with its harvest status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Section code, e.g. "Linux"
    pub code: String,
    pub status: BoardStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_its_own_rendering() {
        for status in [BoardStatus::Pending, BoardStatus::Harvested] {
            assert_eq!(status.as_str().parse::<BoardStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("DONE".parse::<BoardStatus>().is_err());
    }
}
