//! Plays one game against a running server using simple deductions.
//!
//! Run the server first, then `cargo run -p minesweeper-client --example autoplay`.

use minesweeper_client::{CellValue, GameEvent, GameParams, GameState, MinesweeperGame, Pos};

fn neighbors(state: &GameState, pos: Pos) -> Vec<Pos> {
    let mut result = Vec::new();
    for row in pos.row.saturating_sub(1)..(pos.row + 2).min(state.rows) {
        for col in pos.col.saturating_sub(1)..(pos.col + 2).min(state.cols) {
            if (row, col) != (pos.row, pos.col) {
                result.push(Pos::new(row, col));
            }
        }
    }
    result
}

enum Move {
    Reveal(Pos),
    Flag(Pos),
}

/// Looks for a revealed number whose hidden neighbors are all mines or all
/// safe. Falls back to the first hidden cell.
fn next_move(state: &GameState) -> Option<Move> {
    let hidden = |pos: &Pos| !state.is_revealed(*pos) && !state.is_flagged(*pos);

    for row in 0..state.rows {
        for col in 0..state.cols {
            let pos = Pos::new(row, col);
            let Some(CellValue::Adjacent(count)) = state.visible_value(pos) else {
                continue;
            };
            let around = neighbors(state, pos);
            let flagged = around.iter().filter(|p| state.is_flagged(**p)).count();
            let unknown: Vec<Pos> = around.into_iter().filter(|p| hidden(p)).collect();

            if let Some(first) = unknown.first() {
                if flagged == count as usize {
                    return Some(Move::Reveal(*first));
                }
                if flagged + unknown.len() == count as usize {
                    return Some(Move::Flag(*first));
                }
            }
        }
    }

    (0..state.rows)
        .flat_map(|row| (0..state.cols).map(move |col| Pos::new(row, col)))
        .find(|pos| hidden(pos))
        .map(Move::Reveal)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let game = MinesweeperGame::new("http://localhost:8000")?;
    let mut state = game
        .start_game(Some(GameParams {
            rows: 9,
            cols: 9,
            mines: 10,
        }))
        .await?;
    println!("Playing {}x{} with {} mines", state.rows, state.cols, state.mines);

    while !state.is_game_over() {
        let Some(next) = next_move(&state) else {
            break;
        };
        let events = match next {
            Move::Reveal(pos) => game.reveal(pos).await?,
            Move::Flag(pos) => game.flag(pos).await?,
        };
        for event in events {
            if let GameEvent::GameStatusChanged { won, lost } = event {
                println!("Game finished: won={}, lost={}", won, lost);
            }
        }
        state = game.get_state().await.ok_or("game state missing")?;
    }

    if let Some(time) = state.time {
        println!("Won in {} seconds", time);
    }
    for entry in game.client().leaderboard().await? {
        println!("{:>5}s  {} {}  {}", entry.time, entry.date, entry.time_of_day, entry.address);
    }
    Ok(())
}
