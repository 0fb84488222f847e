use std::fmt;

use serde::{Deserialize, Serialize};

/// Content of a single field cell, sent as `"X"` for a mine or the digit of
/// its adjacent mine count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CellValue {
    Mine,
    Adjacent(u8),
}

impl CellValue {
    pub fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mine => f.write_str("X"),
            Self::Adjacent(count) => write!(f, "{count}"),
        }
    }
}

impl From<CellValue> for String {
    fn from(value: CellValue) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for CellValue {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "X" => Ok(Self::Mine),
            digit => match digit.parse::<u8>() {
                Ok(count) if count <= 8 => Ok(Self::Adjacent(count)),
                _ => Err(format!("invalid cell value: {value:?}")),
            },
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct GameParams {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

impl GameParams {
    /// Cell count, or `None` when `rows * cols` overflows.
    pub fn cells(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            mines: 10,
        }
    }
}

/// A finished game on the leaderboard. Only `time` is required so lists
/// written before the other columns existed still load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Elapsed seconds from timer start to the winning move.
    pub time: u64,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time_of_day: String,
    #[serde(default)]
    pub address: String,
}
