use std::{env, path::PathBuf, str::FromStr};

use minesweeper_common::models::GameParams;
use tracing::debug;

/// Runtime settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub leaderboard_path: PathBuf,
    /// Dimensions dealt to a client that has no session yet.
    pub default_params: GameParams,
    pub sessions_per_minute: u32,
    pub cleanup_interval_secs: u64,
    pub inactive_session_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    parse_or(env::var(name).ok(), default)
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            leaderboard_path: env_or("LEADERBOARD_PATH", defaults.leaderboard_path),
            default_params: GameParams {
                rows: env_or("DEFAULT_ROWS", defaults.default_params.rows),
                cols: env_or("DEFAULT_COLS", defaults.default_params.cols),
                mines: env_or("DEFAULT_MINES", defaults.default_params.mines),
            },
            sessions_per_minute: env_or(
                "RATE_LIMIT_SESSIONS_PER_MINUTE",
                defaults.sessions_per_minute,
            ),
            cleanup_interval_secs: env_or(
                "CLEANUP_INTERVAL_SECONDS",
                defaults.cleanup_interval_secs,
            ),
            inactive_session_timeout_secs: env_or(
                "INACTIVE_SESSION_TIMEOUT_SECONDS",
                defaults.inactive_session_timeout_secs,
            ),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|value| parse_origins(&value))
                .unwrap_or(defaults.cors_allowed_origins),
        };
        debug!("Loaded configuration: {:?}", config);
        config
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            leaderboard_path: PathBuf::from("leaderboard.json"),
            default_params: GameParams::default(),
            sessions_per_minute: 10,
            cleanup_interval_secs: 60,
            inactive_session_timeout_secs: 3600,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}
