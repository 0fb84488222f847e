//! Minesweeper web backend.
//!
//! Every browser gets its own game session, identified by a cookie. Sessions
//! live in memory and are dropped after a period of inactivity; winning times
//! go to a small JSON leaderboard on disk.

use std::sync::Arc;

use dashmap::DashMap;
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
    routes,
};
use tracing::{info, warn};

pub mod cleanup;
pub mod config;
pub mod cors;
pub mod data;
pub mod error;
pub mod leaderboard;
pub mod logic;
pub mod rate_limit;
pub mod routes;

use crate::{
    cleanup::start_cleanup_task,
    config::ServerConfig,
    cors::create_cors,
    error::StartupError,
    leaderboard::Leaderboard,
    logic::{Sessions, validate_params},
    rate_limit::RateLimiter,
};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match (
            rocket.state::<Sessions>(),
            rocket.state::<Arc<RateLimiter>>(),
            rocket.state::<ServerConfig>(),
        ) {
            (Some(sessions), Some(rate_limiter), Some(config)) => {
                info!("Starting cleanup task for session management");
                let sessions = sessions.clone();
                let rate_limiter = rate_limiter.clone();
                let interval_secs = config.cleanup_interval_secs;
                let timeout_secs = config.inactive_session_timeout_secs;
                tokio::spawn(async move {
                    start_cleanup_task(sessions, rate_limiter, interval_secs, timeout_secs).await;
                });
            }
            _ => warn!("Failed to get session state for cleanup task"),
        }
        Ok(rocket)
    }
}

/// Assembles the server: managed state, fairings and routes. Fails when the
/// configured defaults or CORS origins are unusable.
pub fn build(config: ServerConfig) -> Result<Rocket<Build>, StartupError> {
    validate_params(&config.default_params)?;
    let sessions: Sessions = Arc::new(DashMap::new());
    let rate_limiter = Arc::new(RateLimiter::per_minute(config.sessions_per_minute));
    let leaderboard = Leaderboard::new(config.leaderboard_path.clone());
    let cors = create_cors(&config.cors_allowed_origins)?;

    info!(
        "Initialized session storage, rate limiter and leaderboard at {}",
        leaderboard.path().display()
    );

    Ok(rocket::build()
        .attach(cors)
        .attach(CleanupFairing)
        .manage(sessions)
        .manage(rate_limiter)
        .manage(leaderboard)
        .manage(config)
        .mount(
            "/",
            routes![
                routes::index,
                routes::click,
                routes::time,
                routes::start_timer,
                routes::settings,
                routes::leaderboard,
            ],
        ))
}
