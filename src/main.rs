//! Headless session runner (default binary).
//!
//! Gestures arrive on stdin, one per line, already classified:
//!
//! - `<row> <column> <up|down|left|right>`: move or swap the block
//! - `restart`: restart the current level
//! - `save`: save now
//! - `grid`: print the grid, top row first
//! - `quit` (or end of input): save and exit
//!
//! Every domain event is printed to stdout. Logs go to stderr and are
//! filtered with `RUST_LOG` (default: info).

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use match_puzzle::adapter::{MatchPuzzleService, ServiceConfig};
use match_puzzle::core::Grid;
use match_puzzle::engine::MatchSettings;
use match_puzzle::types::{Direction, GridPosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Move(GridPosition, Direction),
    Restart,
    Save,
    Grid,
    Quit,
}

fn parse_gesture(line: &str) -> Option<Gesture> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    match first.to_lowercase().as_str() {
        "restart" => return Some(Gesture::Restart),
        "save" => return Some(Gesture::Save),
        "grid" => return Some(Gesture::Grid),
        "quit" | "exit" => return Some(Gesture::Quit),
        _ => {}
    }

    let row = first.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    let direction = Direction::from_str(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Gesture::Move(GridPosition::new(row, column), direction))
}

/// One line per row, top row first; `.` marks an empty cell
fn render(grid: &Grid) -> String {
    let mut out = String::new();
    for row in (0..grid.rows() as i32).rev() {
        for column in 0..grid.columns() as i32 {
            let cell = grid
                .get(GridPosition::new(row, column))
                .and_then(|block| block.block_type().as_str().chars().next())
                .unwrap_or('.');
            out.push(cell);
        }
        out.push('\n');
    }
    out
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env();
    let settings = MatchSettings::from_env();
    info!(
        levels = %config.levels_dir.display(),
        save = %config.save_path.display(),
        "starting session"
    );

    let service = MatchPuzzleService::from_config(&config, settings)
        .await
        .context("failed to open level directory")?
        .build()?;
    service.events().subscribe_all(|event| println!("{event}"));
    service.start_game().await.context("failed to start game")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(gesture) = parse_gesture(line) else {
            warn!(input = line, "unrecognized gesture");
            continue;
        };

        match gesture {
            Gesture::Move(position, direction) => {
                service.move_block(position, direction);
            }
            Gesture::Restart => {
                service.restart_level();
            }
            Gesture::Save => service.save_game().await?,
            Gesture::Grid => {
                if let Some(grid) = service.state().grid_snapshot() {
                    print!("{}", render(&grid));
                }
            }
            Gesture::Quit => break,
        }
        service.wait_idle().await;
    }

    service.wait_idle().await;
    service.save_game().await?;
    service.dispose();
    Ok(())
}
