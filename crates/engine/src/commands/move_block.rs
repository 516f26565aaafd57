use std::sync::Arc;

use crate::callbacks::{AsyncHookFn, BlockMovedFn};
use crate::event_bus::EventBus;
use crate::state::{GameStateManager, SessionState};
use crate::types::{Direction, GridPosition, MoveExecuted};

use super::{check_source, log_rejection, Rejection};

/// Move a block into an adjacent empty cell.
///
/// Upward moves are rejected: lifting a block into empty space would leave
/// it floating.
pub struct MoveCommand {
    state: GameStateManager,
    events: Arc<EventBus>,
    position: GridPosition,
    direction: Direction,
    on_block_moved: Option<BlockMovedFn>,
    on_normalization_needed: Option<AsyncHookFn>,
}

impl MoveCommand {
    pub fn new(
        state: GameStateManager,
        events: Arc<EventBus>,
        position: GridPosition,
        direction: Direction,
    ) -> Self {
        Self {
            state,
            events,
            position,
            direction,
            on_block_moved: None,
            on_normalization_needed: None,
        }
    }

    /// Awaited with the moved block and its previous position
    pub fn on_block_moved(mut self, callback: BlockMovedFn) -> Self {
        self.on_block_moved = Some(callback);
        self
    }

    /// Awaited last, once the move has been applied
    pub fn on_normalization_needed(mut self, callback: AsyncHookFn) -> Self {
        self.on_normalization_needed = Some(callback);
        self
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn validate(&self, state: &SessionState) -> Result<GridPosition, Rejection> {
        let target = check_source(state, self.position, self.direction)?;
        let grid = state.grid().ok_or(Rejection::NoGrid)?;
        if !grid.is_empty(target) {
            return Err(Rejection::TargetOccupied);
        }
        if self.direction == Direction::Up {
            return Err(Rejection::UpwardMove);
        }
        Ok(target)
    }

    /// Validate against the current state, reporting why it fails
    pub fn check(&self) -> Result<GridPosition, Rejection> {
        self.validate(&self.state.lock())
    }

    pub fn can_execute(&self) -> bool {
        match self.check() {
            Ok(_) => true,
            Err(reason) => {
                log_rejection("move", self.position, self.direction, reason);
                false
            }
        }
    }

    pub async fn execute(self) {
        let moved = {
            let mut state = self.state.lock();
            match self.validate(&state) {
                Ok(target) => {
                    let moved = state.grid_mut().and_then(|grid| {
                        let block = grid.remove(self.position)?;
                        let old_position = block.position();
                        grid.set(target, Some(block));
                        grid.get(target).cloned().map(|b| (b, old_position))
                    });
                    if moved.is_some() {
                        state.increment_move_count();
                    }
                    moved
                }
                Err(reason) => {
                    log_rejection("move", self.position, self.direction, reason);
                    None
                }
            }
        };
        let Some((block, old_position)) = moved else {
            return;
        };

        self.events.publish(MoveExecuted {
            position: self.position,
            direction: self.direction,
        });

        if let Some(callback) = &self.on_block_moved {
            callback(block, old_position).await;
        }
        if let Some(callback) = &self.on_normalization_needed {
            callback().await;
        }
    }
}
