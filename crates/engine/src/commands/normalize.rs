use std::sync::Arc;

use tracing::{debug, info};

use crate::callbacks::{join_all, BlockDestroyFn, BlockFallFn, HookFn};
use crate::core::{Block, BlockMove, NormalizationResult};
use crate::event_bus::EventBus;
use crate::settings::MatchSettings;
use crate::state::{GameStateManager, SessionState};
use crate::types::{BlocksDestroyed, BlocksMatched, LevelCompleted};

/// Settle the grid: gravity, match, destroy, repeat until stable.
///
/// `is_normalizing` stays set for the whole run so moves and swipes are
/// rejected until the grid is stable again.
pub struct NormalizeGridCommand {
    state: GameStateManager,
    events: Arc<EventBus>,
    settings: MatchSettings,
    on_block_fall: Option<BlockFallFn>,
    on_block_destroy: Option<BlockDestroyFn>,
    on_complete: Option<HookFn>,
}

impl NormalizeGridCommand {
    pub fn new(state: GameStateManager, events: Arc<EventBus>, settings: MatchSettings) -> Self {
        Self {
            state,
            events,
            settings,
            on_block_fall: None,
            on_block_destroy: None,
            on_complete: None,
        }
    }

    pub fn on_block_fall(mut self, callback: BlockFallFn) -> Self {
        self.on_block_fall = Some(callback);
        self
    }

    pub fn on_block_destroy(mut self, callback: BlockDestroyFn) -> Self {
        self.on_block_destroy = Some(callback);
        self
    }

    /// Called once the grid is stable and the flag has been cleared
    pub fn on_complete(mut self, callback: HookFn) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn can_execute(&self) -> bool {
        ready_to_normalize(&self.state.lock())
    }

    pub async fn execute(self) {
        let Some(guard) = NormalizingGuard::acquire(&self.state) else {
            return;
        };

        let mut cycles = 0usize;
        while let Some(result) = self.run_cycle() {
            cycles += 1;
            debug!(
                cycle = cycles,
                moves = result.moves.len(),
                areas = result.matched_areas.len(),
                "normalization cycle"
            );

            if !result.moves.is_empty() {
                self.settle_falls(&result.moves).await;
            }
            if !result.matched_areas.is_empty() {
                self.destroy_matches(&result).await;
            }
        }

        drop(guard);
        debug!(cycles, "normalization finished");

        if let Some(callback) = &self.on_complete {
            callback();
        }

        let completed = {
            let state = self.state.lock();
            state
                .is_level_complete()
                .then(|| (state.current_level_number(), state.move_count()))
        };
        if let Some((level_number, move_count)) = completed {
            info!(level = level_number, moves = move_count, "level completed");
            self.events.publish(LevelCompleted {
                level_number,
                move_count,
            });
        }
    }

    /// One gravity + match pass; `None` once nothing changed
    fn run_cycle(&self) -> Option<NormalizationResult> {
        let mut state = self.state.lock();
        let engine = state.normalization_engine();
        let grid = state.grid_mut()?;
        let result = engine.normalize(grid);
        result.has_changes().then_some(result)
    }

    /// Flag the moved blocks as falling, await the fall animations, clear the flag
    async fn settle_falls(&self, moves: &[BlockMove]) {
        let falling: Vec<BlockMove> = {
            let mut state = self.state.lock();
            let Some(grid) = state.grid_mut() else {
                return;
            };
            moves
                .iter()
                .filter(|mv| match grid.get_mut(mv.to) {
                    Some(block) => {
                        block.is_falling = true;
                        true
                    }
                    None => false,
                })
                .copied()
                .collect()
        };

        if let Some(callback) = &self.on_block_fall {
            join_all(falling.iter().map(|&mv| callback(mv)).collect()).await;
        }

        let mut state = self.state.lock();
        if let Some(grid) = state.grid_mut() {
            for mv in moves {
                if let Some(block) = grid.get_mut(mv.to) {
                    block.is_falling = false;
                }
            }
        }
    }

    /// Flag matched blocks, await their destroy animations, remove them and
    /// report the total, then pause before the next cycle
    async fn destroy_matches(&self, result: &NormalizationResult) {
        let total = result.matched_count();
        let doomed: Vec<Block> = {
            let mut state = self.state.lock();
            let Some(grid) = state.grid_mut() else {
                return;
            };
            result
                .matched_areas
                .iter()
                .flatten()
                .filter_map(|&pos| {
                    let block = grid.get_mut(pos)?;
                    block.is_being_destroyed = true;
                    Some(block.clone())
                })
                .collect()
        };

        if let Some(callback) = &self.on_block_destroy {
            join_all(doomed.into_iter().map(|block| callback(block)).collect()).await;
        }

        {
            let mut state = self.state.lock();
            let engine = state.normalization_engine();
            if let Some(grid) = state.grid_mut() {
                engine.destroy_blocks(grid, &result.matched_areas);
            }
        }

        self.events.publish(BlocksMatched { count: total });
        self.events.publish(BlocksDestroyed { count: total });

        if self.settings.post_match_delay_ms > 0 {
            tokio::time::sleep(self.settings.post_match_delay()).await;
        }
    }
}

fn ready_to_normalize(session: &SessionState) -> bool {
    if session.grid().is_none() {
        debug!("cannot normalize: no grid loaded");
        return false;
    }
    if session.is_normalizing() {
        debug!("cannot normalize: already normalizing");
        return false;
    }
    true
}

/// Holds `is_normalizing` for one run and clears it on drop, including
/// when the run unwinds.
struct NormalizingGuard {
    state: GameStateManager,
}

impl NormalizingGuard {
    /// Check and set the flag under one lock
    fn acquire(state: &GameStateManager) -> Option<Self> {
        let mut session = state.lock();
        if !ready_to_normalize(&session) {
            return None;
        }
        session.set_normalizing(true);
        drop(session);
        Some(Self {
            state: state.clone(),
        })
    }
}

impl Drop for NormalizingGuard {
    fn drop(&mut self) {
        self.state.set_normalizing(false);
    }
}
