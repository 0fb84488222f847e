//! Types shared by the minesweeper server and its Rust client.

pub mod models;
pub mod protocol;
