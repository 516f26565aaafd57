//! Commands - validity-gated state transitions
//!
//! Every command follows the same contract:
//!
//! - `can_execute()` is a pure check. It never mutates and never fails; an
//!   invalid request simply returns `false`.
//! - `execute()` re-checks validity and is a complete no-op when the check
//!   fails, because state may have changed while the command waited in the
//!   queue.
//!
//! [`Command`] is the closed set the queue schedules.

mod move_block;
mod normalize;
mod restart_level;
mod swipe;
mod switch_level;

use std::fmt;

use tracing::{debug, warn};

pub use move_block::MoveCommand;
pub use normalize::NormalizeGridCommand;
pub use restart_level::RestartLevelCommand;
pub use swipe::SwipeCommand;
pub use switch_level::SwitchLevelCommand;

use crate::state::SessionState;
use crate::types::{Direction, GridPosition};

/// Why a move or swipe is not allowed right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Normalizing,
    NoGrid,
    NoBlock,
    BlockBusy,
    TargetOutOfBounds,
    TargetOccupied,
    TargetEmpty,
    TargetBusy,
    UpwardMove,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Normalizing => "grid is normalizing",
            Rejection::NoGrid => "no grid loaded",
            Rejection::NoBlock => "no block at source",
            Rejection::BlockBusy => "source block cannot interact",
            Rejection::TargetOutOfBounds => "target out of bounds",
            Rejection::TargetOccupied => "target is occupied",
            Rejection::TargetEmpty => "target is empty",
            Rejection::TargetBusy => "target block cannot interact",
            Rejection::UpwardMove => "upward move into empty space",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks shared by move and swipe: no normalization in flight, a grid,
/// an interactable source block and an in-bounds target.
/// Returns the target position.
fn check_source(
    state: &SessionState,
    position: GridPosition,
    direction: Direction,
) -> Result<GridPosition, Rejection> {
    if state.is_normalizing() {
        return Err(Rejection::Normalizing);
    }
    let grid = state.grid().ok_or(Rejection::NoGrid)?;
    let block = grid.get(position).ok_or(Rejection::NoBlock)?;
    if !block.can_interact() {
        return Err(Rejection::BlockBusy);
    }
    grid.neighbor(position, direction)
        .ok_or(Rejection::TargetOutOfBounds)
}

fn log_rejection(command: &str, position: GridPosition, direction: Direction, reason: Rejection) {
    if reason == Rejection::NoGrid {
        warn!(command, %position, %direction, "cannot execute: {}", reason);
    } else {
        debug!(command, %position, %direction, "cannot execute: {}", reason);
    }
}

/// One of the five command kinds
pub enum Command {
    Move(MoveCommand),
    Swipe(SwipeCommand),
    SwitchLevel(SwitchLevelCommand),
    RestartLevel(RestartLevelCommand),
    NormalizeGrid(NormalizeGridCommand),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Move(_) => "move",
            Command::Swipe(_) => "swipe",
            Command::SwitchLevel(_) => "switch_level",
            Command::RestartLevel(_) => "restart_level",
            Command::NormalizeGrid(_) => "normalize_grid",
        }
    }

    pub fn can_execute(&self) -> bool {
        match self {
            Command::Move(cmd) => cmd.can_execute(),
            Command::Swipe(cmd) => cmd.can_execute(),
            Command::SwitchLevel(cmd) => cmd.can_execute(),
            Command::RestartLevel(cmd) => cmd.can_execute(),
            Command::NormalizeGrid(cmd) => cmd.can_execute(),
        }
    }

    pub async fn execute(self) {
        match self {
            Command::Move(cmd) => cmd.execute().await,
            Command::Swipe(cmd) => cmd.execute().await,
            Command::SwitchLevel(cmd) => cmd.execute().await,
            Command::RestartLevel(cmd) => cmd.execute().await,
            Command::NormalizeGrid(cmd) => cmd.execute().await,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<MoveCommand> for Command {
    fn from(cmd: MoveCommand) -> Self {
        Command::Move(cmd)
    }
}

impl From<SwipeCommand> for Command {
    fn from(cmd: SwipeCommand) -> Self {
        Command::Swipe(cmd)
    }
}

impl From<SwitchLevelCommand> for Command {
    fn from(cmd: SwitchLevelCommand) -> Self {
        Command::SwitchLevel(cmd)
    }
}

impl From<RestartLevelCommand> for Command {
    fn from(cmd: RestartLevelCommand) -> Self {
        Command::RestartLevel(cmd)
    }
}

impl From<NormalizeGridCommand> for Command {
    fn from(cmd: NormalizeGridCommand) -> Self {
        Command::NormalizeGrid(cmd)
    }
}
