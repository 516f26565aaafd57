use std::sync::Arc;

use crate::callbacks::{join_all, AsyncHookFn, BlockMovedFn};
use crate::event_bus::EventBus;
use crate::state::{GameStateManager, SessionState};
use crate::types::{Direction, GridPosition, MoveExecuted};

use super::{check_source, log_rejection, Rejection};

/// Swap a block with an occupied neighbor. Any direction is allowed.
pub struct SwipeCommand {
    state: GameStateManager,
    events: Arc<EventBus>,
    position: GridPosition,
    direction: Direction,
    on_block_moved: Option<BlockMovedFn>,
    on_normalization_needed: Option<AsyncHookFn>,
}

impl SwipeCommand {
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

    /// Awaited once per swapped block, both concurrently
    pub fn on_block_moved(mut self, callback: BlockMovedFn) -> Self {
        self.on_block_moved = Some(callback);
        self
    }

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
        let other = grid.get(target).ok_or(Rejection::TargetEmpty)?;
        if !other.can_interact() {
            return Err(Rejection::TargetBusy);
        }
        Ok(target)
    }

    pub fn check(&self) -> Result<GridPosition, Rejection> {
        self.validate(&self.state.lock())
    }

    pub fn can_execute(&self) -> bool {
        match self.check() {
            Ok(_) => true,
            Err(reason) => {
                log_rejection("swipe", self.position, self.direction, reason);
                false
            }
        }
    }

    pub async fn execute(self) {
        let swapped = {
            let mut state = self.state.lock();
            match self.validate(&state) {
                Ok(target) => {
                    let swapped = state.grid_mut().and_then(|grid| {
                        grid.swap(self.position, target);
                        let moved = grid.get(target).cloned()?;
                        let displaced = grid.get(self.position).cloned()?;
                        Some([(moved, self.position), (displaced, target)])
                    });
                    if swapped.is_some() {
                        state.increment_move_count();
                    }
                    swapped
                }
                Err(reason) => {
                    log_rejection("swipe", self.position, self.direction, reason);
                    None
                }
            }
        };
        let Some(swapped) = swapped else {
            return;
        };

        self.events.publish(MoveExecuted {
            position: self.position,
            direction: self.direction,
        });

        if let Some(callback) = &self.on_block_moved {
            let animations = swapped
                .into_iter()
                .map(|(block, old_position)| callback(block, old_position))
                .collect();
            join_all(animations).await;
        }
        if let Some(callback) = &self.on_normalization_needed {
            callback().await;
        }
    }
}
