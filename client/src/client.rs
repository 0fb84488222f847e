use minesweeper_common::{
    models::{GameParams, LeaderboardEntry, Pos},
    protocol::{
        ClickAction, ClickRequest, FlagResponse, IndexResponse, RevealResponse, SettingsResponse,
        TimeResponse,
    },
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Result;

/// HTTP client for the minesweeper server API.
///
/// The server tracks one game per session cookie, so each client instance
/// keeps its own cookie store and therefore plays its own game.
pub struct MinesweeperClient {
    client: Client,
    base_url: Url,
}

fn normalize_base(mut base_url: Url) -> Url {
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    base_url
}

async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    if !response.status().is_success() {
        return Err(format!("Failed to {}: {}", what, response.status()).into());
    }
    Ok(response.json().await?)
}

impl MinesweeperClient {
    /// Create a new client connecting to the specified server URL
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base(Url::parse(base_url)?);
        let client = Client::builder().cookie_store(true).build()?;

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Deal a new game with the session's current dimensions, opening a
    /// session on first use.
    pub async fn new_game(&self) -> Result<IndexResponse> {
        let response = self.client.get(self.endpoint("")?).send().await?;
        parse(response, "start game").await
    }

    /// Change the field dimensions; this also deals a new game.
    pub async fn settings(&self, params: GameParams) -> Result<SettingsResponse> {
        let response = self
            .client
            .post(self.endpoint("settings")?)
            .json(&params)
            .send()
            .await?;
        parse(response, "apply settings").await
    }

    async fn click(&self, pos: Pos, action: ClickAction) -> Result<Response> {
        debug!("Sending {:?} at ({}, {})", action, pos.row, pos.col);
        let request = ClickRequest {
            row: pos.row,
            col: pos.col,
            action,
        };
        Ok(self
            .client
            .post(self.endpoint("click")?)
            .json(&request)
            .send()
            .await?)
    }

    pub async fn reveal(&self, pos: Pos) -> Result<RevealResponse> {
        let response = self.click(pos, ClickAction::Click).await?;
        parse(response, "reveal cell").await
    }

    pub async fn flag(&self, pos: Pos) -> Result<FlagResponse> {
        let response = self.click(pos, ClickAction::Flag).await?;
        parse(response, "toggle flag").await
    }

    /// Seconds on the game clock, 0 before it starts.
    pub async fn elapsed(&self) -> Result<u64> {
        let response = self.client.get(self.endpoint("time")?).send().await?;
        let time: TimeResponse = parse(response, "read timer").await?;
        Ok(time.time)
    }

    pub async fn start_timer(&self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("start_timer")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(format!("Failed to start timer: {}", response.status()).into());
        }
        Ok(())
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let response = self
            .client
            .get(self.endpoint("leaderboard")?)
            .send()
            .await?;
        parse(response, "load leaderboard").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_against_server_root() {
        let client = MinesweeperClient::new("http://localhost:8000").unwrap();
        assert_eq!(
            client.endpoint("click").unwrap().as_str(),
            "http://localhost:8000/click"
        );
        assert_eq!(client.endpoint("").unwrap().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn endpoints_keep_mount_prefix() {
        let client = MinesweeperClient::new("https://games.example/minesweeper").unwrap();
        assert_eq!(
            client.endpoint("start_timer").unwrap().as_str(),
            "https://games.example/minesweeper/start_timer"
        );
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        assert!(MinesweeperClient::new("not a url").is_err());
    }
}
