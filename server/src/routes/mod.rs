use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{
    State, get,
    http::{Cookie, CookieJar, SameSite, Status},
    post,
    request::{self, FromRequest, Request},
    serde::json::Json,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use minesweeper_common::{
    models::{GameParams, LeaderboardEntry},
    protocol::{
        ClickAction, ClickRequest, ClickResponse, IndexResponse, SettingsResponse, TimeResponse,
    },
};

use crate::{
    config::ServerConfig,
    leaderboard::{Leaderboard, entry_for},
    logic::{GameStatus, Session, Sessions},
    rate_limit::{ClientIp, RateLimiter},
};

pub const SESSION_COOKIE: &str = "minesweeper_session";

#[instrument(level = "trace", skip(sessions, session))]
fn add_session(sessions: &Sessions, session: Session) -> String {
    let mut id_length = 10;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match sessions.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("Session ID collision, trying another: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(session)));
                    info!("Created new session with ID: {}", id);
                    return id;
                }
            }
        }

        warn!(
            "Exhausted ID attempts at length {}, increasing to {}",
            id_length,
            id_length + 1
        );
        id_length += 1;
    }
}

fn find_session(sessions: &Sessions, cookies: &CookieJar<'_>) -> Option<Arc<Mutex<Session>>> {
    let id = cookies.get(SESSION_COOKIE)?;
    sessions.get(id.value()).map(|entry| entry.value().clone())
}

fn set_session_cookie(cookies: &CookieJar<'_>, id: String) {
    cookies.add(
        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    );
}

/// Starts a session for a caller without one, subject to the rate limit.
fn open_session(
    sessions: &Sessions,
    rate_limiter: &RateLimiter,
    client_ip: &ClientIp,
    cookies: &CookieJar<'_>,
    params: GameParams,
) -> Result<(), Status> {
    rate_limiter.check(&client_ip.0)?;
    let session = Session::new(params).map_err(|e| {
        warn!("Rejected session params from {}: {}", client_ip.0, e);
        e.status()
    })?;
    let id = add_session(sessions, session);
    set_session_cookie(cookies, id);
    Ok(())
}

/// The caller's session, found through the session cookie.
pub struct ActiveSession(pub Arc<Mutex<Session>>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ActiveSession {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(sessions) = req.rocket().state::<Sessions>() else {
            error!("Session store is not managed");
            return request::Outcome::Error((Status::InternalServerError, ()));
        };

        match find_session(sessions, req.cookies()) {
            Some(session) => request::Outcome::Success(ActiveSession(session)),
            None => {
                debug!("Request without a live session: {}", req.uri());
                request::Outcome::Error((Status::NotFound, ()))
            }
        }
    }
}

async fn load_for_display(leaderboard: &Leaderboard) -> Vec<LeaderboardEntry> {
    leaderboard.load().await.unwrap_or_else(|e| {
        warn!("Showing empty leaderboard: {}", e);
        Vec::new()
    })
}

#[get("/")]
#[instrument(level = "trace", skip_all, fields(client_ip = %client_ip.0))]
pub async fn index(
    sessions: &State<Sessions>,
    rate_limiter: &State<Arc<RateLimiter>>,
    leaderboard: &State<Leaderboard>,
    config: &State<ServerConfig>,
    client_ip: ClientIp,
    cookies: &CookieJar<'_>,
) -> Result<Json<IndexResponse>, Status> {
    let params = match find_session(sessions, cookies) {
        Some(session) => {
            let mut session = session.lock().await;
            let params = session.params();
            session.restart(params).map_err(|e| e.status())?;
            params
        }
        None => {
            open_session(
                sessions,
                rate_limiter,
                &client_ip,
                cookies,
                config.default_params,
            )?;
            config.default_params
        }
    };

    Ok(Json(IndexResponse {
        rows: params.rows,
        cols: params.cols,
        mines: params.mines,
        mines_remaining: params.mines as i64,
        leaderboard: load_for_display(leaderboard).await,
    }))
}

#[post("/click", data = "<request>")]
#[instrument(level = "trace", skip_all, fields(client_ip = %client_ip.0, row = request.row, col = request.col))]
pub async fn click(
    request: Json<ClickRequest>,
    session: ActiveSession,
    leaderboard: &State<Leaderboard>,
    client_ip: ClientIp,
) -> Result<Json<ClickResponse>, Status> {
    let (status, response) = {
        let mut session = session.0.lock().await;
        match request.action {
            ClickAction::Click => {
                let status = session.reveal(request.pos()).map_err(|e| e.status())?;
                (status, ClickResponse::Reveal(session.reveal_response()))
            }
            ClickAction::Flag => {
                let status = session.toggle_flag(request.pos()).map_err(|e| e.status())?;
                (status, ClickResponse::Flag(session.flag_response()))
            }
        }
    };

    if let GameStatus::Won { time } = status {
        info!("Client {} won in {}s", client_ip.0, time);
        if let Err(e) = leaderboard.record(entry_for(time, client_ip.0)).await {
            error!("Failed to record win for {}: {}", client_ip.0, e);
        }
    }

    Ok(Json(response))
}

#[get("/time")]
pub async fn time(session: ActiveSession) -> Json<TimeResponse> {
    let mut session = session.0.lock().await;
    session.touch();
    Json(TimeResponse {
        time: session.elapsed_secs(),
    })
}

#[post("/start_timer")]
pub async fn start_timer(session: ActiveSession) -> Status {
    let mut session = session.0.lock().await;
    if !session.start_timer() {
        debug!("Timer already running");
    }
    Status::NoContent
}

#[post("/settings", data = "<params>")]
#[instrument(level = "trace", skip_all, fields(client_ip = %client_ip.0, rows = params.rows, cols = params.cols, mines = params.mines))]
pub async fn settings(
    params: Json<GameParams>,
    sessions: &State<Sessions>,
    rate_limiter: &State<Arc<RateLimiter>>,
    client_ip: ClientIp,
    cookies: &CookieJar<'_>,
) -> Result<Json<SettingsResponse>, Status> {
    let params = params.into_inner();
    info!(
        "Settings from {}: {}x{} with {} mines",
        client_ip.0, params.rows, params.cols, params.mines
    );

    match find_session(sessions, cookies) {
        Some(session) => session.lock().await.restart(params).map_err(|e| {
            warn!("Rejected settings from {}: {}", client_ip.0, e);
            e.status()
        })?,
        None => open_session(sessions, rate_limiter, &client_ip, cookies, params)?,
    }

    Ok(Json(SettingsResponse {
        success: true,
        rows: params.rows,
        cols: params.cols,
        mines: params.mines,
    }))
}

#[get("/leaderboard")]
pub async fn leaderboard(
    leaderboard: &State<Leaderboard>,
) -> Result<Json<Vec<LeaderboardEntry>>, Status> {
    leaderboard.load().await.map(Json).map_err(|e| {
        error!("Failed to load leaderboard: {}", e);
        Status::InternalServerError
    })
}
