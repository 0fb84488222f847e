use std::{
    io::ErrorKind,
    net::IpAddr,
    path::{Path, PathBuf},
};

use chrono::Local;
use tokio::{fs, sync::Mutex};
use tracing::{debug, info, instrument};

use minesweeper_common::models::LeaderboardEntry;

use crate::error::LeaderboardError;

pub const LEADERBOARD_SIZE: usize = 10;

/// Best times, persisted as a JSON array on disk.
///
/// Recording a time is a read-modify-write of the whole file; it runs under
/// `writer` so two games finishing together cannot drop each other's entry.
pub struct Leaderboard {
    path: PathBuf,
    writer: Mutex<()>,
}

/// Entry for a game won just now from `address`.
pub fn entry_for(time: u64, address: IpAddr) -> LeaderboardEntry {
    let now = Local::now();
    LeaderboardEntry {
        time,
        date: now.format("%Y-%m-%d").to_string(),
        time_of_day: now.format("%H:%M:%S").to_string(),
        address: address.to_string(),
    }
}

/// Sorts ascending by time and keeps the best entries. Ties keep their
/// previous order.
pub fn rank(entries: &mut Vec<LeaderboardEntry>) {
    entries.sort_by_key(|entry| entry.time);
    entries.truncate(LEADERBOARD_SIZE);
}

impl Leaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored entries. A missing file is an empty leaderboard.
    pub async fn load(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No leaderboard at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(LeaderboardError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&text).map_err(|source| LeaderboardError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Adds a finished game and returns the updated leaderboard.
    #[instrument(level = "trace", skip(self), fields(time = entry.time))]
    pub async fn record(
        &self,
        entry: LeaderboardEntry,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let _guard = self.writer.lock().await;

        let mut entries = self.load().await?;
        entries.push(entry);
        rank(&mut entries);
        self.save(&entries).await?;

        info!("Leaderboard updated, {} entries", entries.len());
        Ok(entries)
    }

    /// Writes a sibling temp file and renames it over the leaderboard, so a
    /// concurrent `load` sees either the old or the new list.
    async fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), LeaderboardError> {
        let io_error = |source| LeaderboardError::Io {
            path: self.path.clone(),
            source,
        };

        let text = serde_json::to_string(entries).map_err(|source| LeaderboardError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, text).await.map_err(io_error)?;
        fs::rename(&tmp, &self.path).await.map_err(io_error)
    }
}
