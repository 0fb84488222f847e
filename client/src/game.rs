use minesweeper_common::{
    models::{CellValue, GameParams, Pos},
    protocol::{FlagResponse, IndexResponse, RevealResponse},
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{MinesweeperClient, Result};

/// Events produced by applying a server answer to the local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Cells that became revealed or changed flag state
    BoardUpdated { changed_positions: Vec<Pos> },
    /// The game was won or lost
    GameStatusChanged { won: bool, lost: bool },
}

/// Local mirror of the server-side game
#[derive(Debug, Clone)]
pub struct GameState {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub mines_remaining: i64,
    /// Only known once the server has sent it with a reveal answer
    pub field: Option<Vec<Vec<CellValue>>>,
    pub revealed: Vec<Vec<bool>>,
    pub flags: Vec<Vec<bool>>,
    pub won: bool,
    pub lost: bool,
    /// Winning time in seconds
    pub time: Option<u64>,
}

fn diff(old: &[Vec<bool>], new: &[Vec<bool>]) -> Vec<Pos> {
    new.iter()
        .enumerate()
        .flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, value)| {
                let before = old.get(row).and_then(|r| r.get(col)).copied().unwrap_or(false);
                (before != *value).then_some(Pos::new(row, col))
            })
        })
        .collect()
}

impl GameState {
    /// Fresh state for a newly dealt game
    pub fn new(rows: usize, cols: usize, mines: usize) -> Self {
        Self {
            rows,
            cols,
            mines,
            mines_remaining: mines as i64,
            field: None,
            revealed: vec![vec![false; cols]; rows],
            flags: vec![vec![false; cols]; rows],
            won: false,
            lost: false,
            time: None,
        }
    }

    pub fn from_index(index: &IndexResponse) -> Self {
        Self::new(index.rows, index.cols, index.mines)
    }

    /// Check if the game is in a completed state (won or lost)
    pub fn is_game_over(&self) -> bool {
        self.won || self.lost
    }

    pub fn is_revealed(&self, pos: Pos) -> bool {
        self.revealed
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_flagged(&self, pos: Pos) -> bool {
        self.flags
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .copied()
            .unwrap_or(false)
    }

    /// The cell value, if revealed
    pub fn visible_value(&self, pos: Pos) -> Option<CellValue> {
        if !self.is_revealed(pos) {
            return None;
        }
        self.field.as_ref()?.get(pos.row)?.get(pos.col).copied()
    }

    fn apply_status(&mut self, won: bool, lost: bool, time: Option<u64>, events: &mut Vec<GameEvent>) {
        if won == self.won && lost == self.lost {
            return;
        }
        self.won = won;
        self.lost = lost;
        self.time = time;
        events.push(GameEvent::GameStatusChanged { won, lost });
    }

    pub fn apply_reveal(&mut self, response: RevealResponse) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let changed_positions = diff(&self.revealed, &response.revealed);
        self.revealed = response.revealed;
        self.flags = response.flags;
        self.field = Some(response.field);
        if !changed_positions.is_empty() {
            events.push(GameEvent::BoardUpdated { changed_positions });
        }

        let won = response.won.unwrap_or(false);
        self.apply_status(won, !response.success, response.time, &mut events);
        events
    }

    pub fn apply_flag(&mut self, response: FlagResponse) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let changed_positions = diff(&self.flags, &response.flags);
        self.flags = response.flags;
        self.mines_remaining = response.mines_remaining;
        if !changed_positions.is_empty() {
            events.push(GameEvent::BoardUpdated { changed_positions });
        }

        let won = response.won.unwrap_or(false);
        self.apply_status(won, self.lost, response.time, &mut events);
        events
    }
}

/// High-level minesweeper game client that manages game state locally
pub struct MinesweeperGame {
    client: MinesweeperClient,
    state: RwLock<Option<GameState>>,
}

impl MinesweeperGame {
    pub fn new(server_url: &str) -> Result<Self> {
        Ok(Self {
            client: MinesweeperClient::new(server_url)?,
            state: RwLock::new(None),
        })
    }

    pub fn client(&self) -> &MinesweeperClient {
        &self.client
    }

    /// Deal a new game, optionally with new dimensions
    pub async fn start_game(&self, params: Option<GameParams>) -> Result<GameState> {
        if let Some(params) = params {
            info!(
                "Starting new game: {}x{} with {} mines",
                params.rows, params.cols, params.mines
            );
            self.client.settings(params).await?;
        }

        let index = self.client.new_game().await?;
        let state = GameState::from_index(&index);
        info!(
            "Game ready: {}x{} with {} mines, {} leaderboard entries",
            index.rows,
            index.cols,
            index.mines,
            index.leaderboard.len()
        );

        *self.state.write().await = Some(state.clone());
        Ok(state)
    }

    async fn ensure_started(&self) -> Result<()> {
        if self.state.read().await.is_none() {
            return Err("No game in progress. Call start_game() first.".into());
        }
        Ok(())
    }

    /// Reveal a cell at the specified position
    pub async fn reveal(&self, pos: Pos) -> Result<Vec<GameEvent>> {
        self.ensure_started().await?;
        debug!("Revealing cell at ({}, {})", pos.row, pos.col);

        let response = self.client.reveal(pos).await?;
        let mut state = self.state.write().await;
        Ok(state
            .as_mut()
            .map(|state| state.apply_reveal(response))
            .unwrap_or_default())
    }

    /// Flag/unflag a cell at the specified position
    pub async fn flag(&self, pos: Pos) -> Result<Vec<GameEvent>> {
        self.ensure_started().await?;
        debug!("Flagging cell at ({}, {})", pos.row, pos.col);

        let response = self.client.flag(pos).await?;
        let mut state = self.state.write().await;
        Ok(state
            .as_mut()
            .map(|state| state.apply_flag(response))
            .unwrap_or_default())
    }

    /// Get the current game state
    pub async fn get_state(&self) -> Option<GameState> {
        self.state.read().await.clone()
    }
}
