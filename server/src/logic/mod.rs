use std::{sync::Arc, time::Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use minesweeper_common::{
    models::{GameParams, Pos},
    protocol::{ClickAction, FlagResponse, RevealResponse},
};

use crate::error::{GameError, Result};

mod board;

pub use board::{Board, MAX_CELLS, RevealOutcome, validate_params};

pub type Sessions = Arc<DashMap<String, Arc<Mutex<Session>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    Won { time: u64 },
    Lost,
}

impl GameStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// One client's game: the board, its timer and when it was last touched.
pub struct Session {
    board: Board,
    params: GameParams,
    timer_started: Option<Instant>,
    status: GameStatus,
    last_activity: Instant,
}

impl Session {
    #[instrument(level = "trace")]
    pub fn new(params: GameParams) -> Result<Self> {
        let board = Board::generate(params, &mut rand::rng())?;
        info!(
            "Creating new session: {}x{} with {} mines",
            params.rows, params.cols, params.mines
        );
        Ok(Self::with_board(board))
    }

    /// Wraps an already dealt board, e.g. one with a known mine layout.
    pub fn with_board(board: Board) -> Self {
        Self {
            params: GameParams {
                rows: board.rows(),
                cols: board.cols(),
                mines: board.mines(),
            },
            board,
            timer_started: None,
            status: GameStatus::Playing,
            last_activity: Instant::now(),
        }
    }

    /// Deals a fresh field with `params` and resets the timer. The old game
    /// stays untouched when the params are invalid.
    #[instrument(level = "trace", skip(self))]
    pub fn restart(&mut self, params: GameParams) -> Result<()> {
        let board = Board::generate(params, &mut rand::rng())?;
        info!(
            "Restarting session with {}x{} and {} mines",
            params.rows, params.cols, params.mines
        );
        *self = Self::with_board(board);
        Ok(())
    }

    pub fn params(&self) -> GameParams {
        self.params
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Starts the clock; returns false if it was already running.
    pub fn start_timer(&mut self) -> bool {
        self.touch();
        if self.timer_started.is_some() {
            return false;
        }
        debug!("Timer started");
        self.timer_started = Some(Instant::now());
        true
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.timer_started
            .map(|started| started.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn should_cleanup(&self, inactive_timeout_secs: u64) -> bool {
        self.last_activity.elapsed().as_secs() > inactive_timeout_secs
    }

    fn begin_move(&mut self, pos: Pos) -> Result<()> {
        if self.status.is_finished() {
            debug!(
                "Ignoring move on finished game at ({}, {})",
                pos.row, pos.col
            );
            return Err(GameError::AlreadyEnded);
        }
        if !self.board.field().contains(pos) {
            return Err(GameError::InvalidCoords {
                row: pos.row,
                col: pos.col,
            });
        }
        self.start_timer();
        Ok(())
    }

    fn check_won(&mut self) {
        if self.board.is_won() {
            let time = self.elapsed_secs();
            info!("Game won in {}s", time);
            self.status = GameStatus::Won { time };
        }
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn reveal(&mut self, pos: Pos) -> Result<GameStatus> {
        self.begin_move(pos)?;

        match self.board.reveal(pos)? {
            RevealOutcome::Detonated(mine) => {
                info!("Player hit mine at ({}, {}) - game over", mine.row, mine.col);
                self.status = GameStatus::Lost;
            }
            RevealOutcome::Cleared(cells) => {
                debug!("Revealed {} cells", cells.len());
                self.check_won();
            }
        }

        Ok(self.status)
    }

    #[instrument(level = "trace", skip(self), fields(row = pos.row, col = pos.col))]
    pub fn toggle_flag(&mut self, pos: Pos) -> Result<GameStatus> {
        self.begin_move(pos)?;

        let flagged = self.board.toggle_flag(pos)?;
        debug!(
            "Cell ({}, {}) {}, {} mines remaining",
            pos.row,
            pos.col,
            if flagged { "flagged" } else { "unflagged" },
            self.board.mines_remaining()
        );
        self.check_won();

        Ok(self.status)
    }

    fn won_time(&self) -> Option<u64> {
        match self.status {
            GameStatus::Won { time } => Some(time),
            _ => None,
        }
    }

    pub fn reveal_response(&self) -> RevealResponse {
        RevealResponse {
            success: self.status != GameStatus::Lost,
            field: self.board.field().to_rows(),
            revealed: self.board.revealed().to_rows(),
            flags: self.board.flags().to_rows(),
            won: self.won_time().map(|_| true),
            time: self.won_time(),
        }
    }

    pub fn flag_response(&self) -> FlagResponse {
        FlagResponse {
            action: ClickAction::Flag,
            flags: self.board.flags().to_rows(),
            mines_remaining: self.board.mines_remaining(),
            won: self.won_time().map(|_| true),
            time: self.won_time(),
        }
    }
}
