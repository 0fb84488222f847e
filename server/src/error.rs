use std::{io, path::PathBuf};

use rocket::http::Status;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates ({row}, {col})")]
    InvalidCoords { row: usize, col: usize },
    #[error("Too many mines: requested {mines} but the field only fits {cells}")]
    TooManyMines { mines: usize, cells: usize },
    #[error("Field needs at least one row and one column")]
    EmptyField,
    #[error("Field of {rows}x{cols} exceeds the limit of {max} cells")]
    FieldTooLarge { rows: usize, cols: usize, max: usize },
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
}

impl GameError {
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidCoords { .. } => Status::BadRequest,
            Self::TooManyMines { .. } | Self::EmptyField | Self::FieldTooLarge { .. } => {
                Status::UnprocessableEntity
            }
            Self::AlreadyEnded => Status::Conflict,
        }
    }
}

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Cannot access leaderboard at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Leaderboard at {} is not a valid entry list: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reasons the server refuses to start.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Invalid CORS configuration: {0}")]
    Cors(#[from] rocket_cors::Error),
    #[error("Invalid default game parameters: {0}")]
    DefaultParams(#[from] GameError),
}

pub type Result<T, E = GameError> = core::result::Result<T, E>;
