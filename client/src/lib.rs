//! Minesweeper Client Library
//!
//! This library provides a Rust client for the minesweeper web backend.
//!
//! ## Usage
//!
//! ### High-Level Interface (Recommended)
//!
//! `MinesweeperGame` keeps a local copy of the board and turns server
//! answers into events:
//!
//! ```rust,no_run
//! use minesweeper_client::{GameParams, MinesweeperGame, Pos};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let game = MinesweeperGame::new("http://localhost:8000")?;
//!
//!     game.start_game(Some(GameParams { rows: 8, cols: 8, mines: 10 })).await?;
//!     game.reveal(Pos::new(0, 0)).await?;
//!     game.flag(Pos::new(1, 1)).await?;
//!
//!     if let Some(state) = game.get_state().await {
//!         println!("Game over: {}, Won: {}", state.is_game_over(), state.won);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Low-Level Interface
//!
//! `MinesweeperClient` maps one method to each endpoint:
//!
//! ```rust,no_run
//! use minesweeper_client::{MinesweeperClient, Pos};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = MinesweeperClient::new("http://localhost:8000")?;
//!     let game = client.new_game().await?;
//!     println!("{}x{} with {} mines", game.rows, game.cols, game.mines);
//!
//!     let answer = client.reveal(Pos::new(0, 0)).await?;
//!     println!("Survived: {}", answer.success);
//!     Ok(())
//! }
//! ```

mod client;
mod game;

pub use client::MinesweeperClient;
pub use game::{GameEvent, GameState, MinesweeperGame};

// Re-export common types for convenience
pub use minesweeper_common::{models::*, protocol::*};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
