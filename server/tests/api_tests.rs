//! End-to-end tests driving the Rocket app through a local client.

use std::{env, path::PathBuf, sync::Arc};

use rocket::{
    http::{ContentType, Cookie, Status},
    local::asynchronous::{Client, LocalResponse},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use minesweeper_common::{
    models::{CellValue, GameParams, LeaderboardEntry, Pos},
    protocol::{
        ClickAction, ClickRequest, FlagResponse, IndexResponse, RevealResponse, SettingsResponse,
        TimeResponse,
    },
};
use minesweeper_server::{
    build,
    config::ServerConfig,
    error::{GameError, StartupError},
    logic::{Board, Session, Sessions},
    routes::SESSION_COOKIE,
};

fn test_config() -> ServerConfig {
    ServerConfig {
        leaderboard_path: env::temp_dir().join(format!("leaderboard-{}.json", Uuid::new_v4())),
        ..ServerConfig::default()
    }
}

async fn tracked_client(config: ServerConfig) -> Client {
    let rocket = build(config).expect("valid server config");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

fn leaderboard_path(client: &Client) -> PathBuf {
    client
        .rocket()
        .state::<ServerConfig>()
        .expect("config is managed")
        .leaderboard_path
        .clone()
}

fn current_session(client: &Client) -> Arc<Mutex<Session>> {
    let id = client
        .cookies()
        .get(SESSION_COOKIE)
        .expect("session cookie is set")
        .value()
        .to_string();
    client
        .rocket()
        .state::<Sessions>()
        .expect("sessions are managed")
        .get(&id)
        .expect("session exists")
        .value()
        .clone()
}

/// Opens a session and swaps in a 3×3 board with a single mine at (0, 0).
async fn client_with_corner_mine() -> Client {
    let client = tracked_client(test_config()).await;
    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    drop(response);

    let board = Board::with_mines(3, 3, &[Pos::new(0, 0)]).unwrap();
    *current_session(&client).lock().await = Session::with_board(board);
    client
}

async fn send_click(
    client: &Client,
    row: usize,
    col: usize,
    action: ClickAction,
) -> LocalResponse<'_> {
    client
        .post("/click")
        .json(&ClickRequest { row, col, action })
        .dispatch()
        .await
}

#[rocket::async_test]
async fn index_opens_session_with_default_dimensions() {
    let client = tracked_client(test_config()).await;

    let response = client.get("/").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: IndexResponse = response.into_json().await.unwrap();

    assert_eq!((body.rows, body.cols, body.mines), (10, 10, 10));
    assert_eq!(body.mines_remaining, 10);
    assert!(body.leaderboard.is_empty());
    assert!(client.cookies().get(SESSION_COOKIE).is_some());
}

#[rocket::async_test]
async fn settings_then_index_deals_requested_field() {
    let client = tracked_client(test_config()).await;
    client.get("/").dispatch().await;

    let response = client
        .post("/settings")
        .json(&GameParams {
            rows: 5,
            cols: 5,
            mines: 3,
        })
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let settings: SettingsResponse = response.into_json().await.unwrap();
    assert!(settings.success);

    let body: IndexResponse = client.get("/").dispatch().await.into_json().await.unwrap();
    assert_eq!((body.rows, body.cols, body.mines), (5, 5, 3));

    let session = current_session(&client);
    let session = session.lock().await;
    let field = session.board().field();
    assert_eq!((field.rows(), field.cols()), (5, 5));
    assert_eq!(field.count(|cell| cell.is_mine()), 3);
}

#[rocket::async_test]
async fn settings_without_session_opens_one() {
    let client = tracked_client(test_config()).await;
    let response = client
        .post("/settings")
        .json(&GameParams {
            rows: 4,
            cols: 6,
            mines: 2,
        })
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let session = current_session(&client);
    assert_eq!(
        session.lock().await.params(),
        GameParams {
            rows: 4,
            cols: 6,
            mines: 2
        }
    );
}

#[rocket::async_test]
async fn settings_rejects_more_mines_than_cells() {
    let client = tracked_client(test_config()).await;
    client.get("/").dispatch().await;

    let response = client
        .post("/settings")
        .json(&GameParams {
            rows: 2,
            cols: 2,
            mines: 5,
        })
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
}

#[rocket::async_test]
async fn settings_rejects_oversized_fields_and_keeps_the_game() {
    let client = client_with_corner_mine().await;

    for (rows, cols) in [(usize::MAX / 2 + 1, 2), (100_000, 100_000)] {
        let response = client
            .post("/settings")
            .json(&GameParams {
                rows,
                cols,
                mines: 0,
            })
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    let session = current_session(&client);
    assert_eq!(session.lock().await.board().rows(), 3);
    let response = send_click(&client, 2, 2, ClickAction::Click).await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn oversized_settings_without_session_open_nothing() {
    let client = tracked_client(test_config()).await;
    let response = client
        .post("/settings")
        .json(&GameParams {
            rows: usize::MAX / 2 + 1,
            cols: 2,
            mines: 0,
        })
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    assert!(client.cookies().get(SESSION_COOKIE).is_none());
}

#[test]
fn startup_rejects_unusable_default_params() {
    let too_many_mines = ServerConfig {
        default_params: GameParams {
            rows: 10,
            cols: 10,
            mines: 500,
        },
        ..test_config()
    };
    assert!(matches!(
        build(too_many_mines),
        Err(StartupError::DefaultParams(GameError::TooManyMines { .. }))
    ));

    let too_large = ServerConfig {
        default_params: GameParams {
            rows: 100_000,
            cols: 100_000,
            mines: 10,
        },
        ..test_config()
    };
    assert!(matches!(
        build(too_large),
        Err(StartupError::DefaultParams(GameError::FieldTooLarge { .. }))
    ));
}

#[rocket::async_test]
async fn click_without_session_is_not_found() {
    let client = tracked_client(test_config()).await;
    let response = send_click(&client, 0, 0, ClickAction::Click).await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn malformed_click_body_is_rejected() {
    let client = tracked_client(test_config()).await;
    client.get("/").dispatch().await;

    let response = client
        .post("/click")
        .header(ContentType::JSON)
        .body(r#"{"row": 1}"#)
        .dispatch()
        .await;
    assert!(response.status().class().is_client_error());
}

#[rocket::async_test]
async fn click_outside_field_is_bad_request() {
    let client = client_with_corner_mine().await;
    let response = send_click(&client, 3, 0, ClickAction::Click).await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn clicking_zero_cell_cascades() {
    let client = client_with_corner_mine().await;

    let response = send_click(&client, 2, 2, ClickAction::Click).await;
    assert_eq!(response.status(), Status::Ok);
    let body: RevealResponse = response.into_json().await.unwrap();

    assert!(body.success);
    assert_eq!(body.won, None);
    assert_eq!(body.field[0][0], CellValue::Mine);
    assert_eq!(
        body.revealed,
        vec![
            vec![false, true, true],
            vec![true, true, true],
            vec![true, true, true],
        ]
    );
}

#[rocket::async_test]
async fn clicking_mine_loses_and_ends_game() {
    let client = client_with_corner_mine().await;

    let body: RevealResponse = send_click(&client, 0, 0, ClickAction::Click)
        .await
        .into_json()
        .await
        .unwrap();
    assert!(!body.success);
    assert_eq!(body.revealed.iter().flatten().filter(|r| **r).count(), 1);

    let again = send_click(&client, 2, 2, ClickAction::Click).await;
    assert_eq!(again.status(), Status::Conflict);
}

#[rocket::async_test]
async fn flagging_updates_mines_remaining() {
    let client = client_with_corner_mine().await;

    let body: FlagResponse = send_click(&client, 1, 1, ClickAction::Flag)
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body.action, ClickAction::Flag);
    assert_eq!(body.mines_remaining, 0);
    assert!(body.flags[1][1]);

    let body: FlagResponse = send_click(&client, 1, 1, ClickAction::Flag)
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body.mines_remaining, 1);
    assert!(!body.flags[1][1]);
}

#[rocket::async_test]
async fn winning_records_leaderboard_entry() {
    let client = client_with_corner_mine().await;

    send_click(&client, 2, 2, ClickAction::Click).await;
    let body: FlagResponse = send_click(&client, 0, 0, ClickAction::Flag)
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(body.won, Some(true));
    assert!(body.time.is_some());

    let entries: Vec<LeaderboardEntry> = client
        .get("/leaderboard")
        .dispatch()
        .await
        .into_json()
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(Some(entries[0].time), body.time);
    assert_eq!(entries[0].address, "127.0.0.1");

    // a finished game cannot be won twice
    let again = send_click(&client, 0, 0, ClickAction::Flag).await;
    assert_eq!(again.status(), Status::Conflict);

    tokio::fs::remove_file(leaderboard_path(&client)).await.unwrap();
}

#[rocket::async_test]
async fn index_after_win_shows_leaderboard_and_new_game() {
    let client = client_with_corner_mine().await;
    send_click(&client, 0, 0, ClickAction::Flag).await;
    send_click(&client, 2, 2, ClickAction::Click).await;

    let body: IndexResponse = client.get("/").dispatch().await.into_json().await.unwrap();
    assert_eq!(body.leaderboard.len(), 1);
    assert_eq!((body.rows, body.cols, body.mines), (3, 3, 1));

    let session = current_session(&client);
    assert!(!session.lock().await.status().is_finished());

    tokio::fs::remove_file(leaderboard_path(&client)).await.unwrap();
}

#[rocket::async_test]
async fn timer_reports_zero_until_started() {
    let client = tracked_client(test_config()).await;
    client.get("/").dispatch().await;

    let body: TimeResponse = client.get("/time").dispatch().await.into_json().await.unwrap();
    assert_eq!(body.time, 0);

    let response = client.post("/start_timer").dispatch().await;
    assert_eq!(response.status(), Status::NoContent);
    assert!(!current_session(&client).lock().await.start_timer());
}

#[rocket::async_test]
async fn requests_only_reach_the_session_named_by_cookie() {
    let client = Client::untracked(build(test_config()).unwrap()).await.unwrap();
    let response = client.get("/").dispatch().await;
    let id = response
        .cookies()
        .get(SESSION_COOKIE)
        .expect("session cookie is set")
        .value()
        .to_string();

    let click = |id: String| {
        client
            .post("/click")
            .cookie(Cookie::new(SESSION_COOKIE, id))
            .json(&ClickRequest {
                row: 0,
                col: 0,
                action: ClickAction::Flag,
            })
    };

    assert_eq!(click("unknown".into()).dispatch().await.status(), Status::NotFound);
    assert_eq!(click(id).dispatch().await.status(), Status::Ok);
}

#[rocket::async_test]
async fn new_sessions_are_rate_limited() {
    let config = ServerConfig {
        sessions_per_minute: 1,
        ..test_config()
    };
    let client = Client::untracked(build(config).unwrap()).await.unwrap();

    assert_eq!(client.get("/").dispatch().await.status(), Status::Ok);
    assert_eq!(
        client.get("/").dispatch().await.status(),
        Status::TooManyRequests
    );
}
