use minesweeper_server::{build, config::ServerConfig};
use tracing::info;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    info!("🚀 Starting Minesweeper server");

    let rocket = build(ServerConfig::from_env())?;
    info!("📡 Endpoints: GET /, POST /click, GET /time, POST /start_timer, POST /settings, GET /leaderboard");

    rocket.launch().await?;
    Ok(())
}
