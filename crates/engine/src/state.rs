//! Game state manager - authoritative session state
//!
//! [`SessionState`] is the plain data (grid, level, counters, normalization
//! flag). [`GameStateManager`] is the cheap-to-clone handle commands share:
//! it guards the data with a mutex and owns the persistence collaborator.
//!
//! The lock is never held across an `.await`. Commands take it, mutate,
//! snapshot whatever their callbacks need, and release it before awaiting.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::core::{
    BlockIdAllocator, GameStateProfileData, Grid, Level, LevelStateProfileData,
    NormalizationEngine,
};
use crate::error::PersistenceError;
use crate::persistence::Persistence;
use crate::types::{DEFAULT_MIN_MATCH_LENGTH, FIRST_LEVEL_NUMBER};

/// Mutable session data
#[derive(Debug)]
pub struct SessionState {
    grid: Option<Grid>,
    level: Option<Level>,
    current_level_number: u32,
    move_count: u32,
    is_normalizing: bool,
    normalization_engine: NormalizationEngine,
    ids: Arc<BlockIdAllocator>,
}

impl SessionState {
    fn new(ids: Arc<BlockIdAllocator>) -> Self {
        Self {
            grid: None,
            level: None,
            current_level_number: FIRST_LEVEL_NUMBER,
            move_count: 0,
            is_normalizing: false,
            normalization_engine: NormalizationEngine::new(DEFAULT_MIN_MATCH_LENGTH),
            ids,
        }
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut Grid> {
        self.grid.as_mut()
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn current_level_number(&self) -> u32 {
        self.current_level_number
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn is_normalizing(&self) -> bool {
        self.is_normalizing
    }

    pub fn set_normalizing(&mut self, value: bool) {
        self.is_normalizing = value;
    }

    pub fn normalization_engine(&self) -> NormalizationEngine {
        self.normalization_engine
    }

    pub fn ids(&self) -> &Arc<BlockIdAllocator> {
        &self.ids
    }

    /// Reset counters and build a fresh grid from the level's seed data
    pub fn initialize_level(&mut self, level: &Level) {
        self.grid = Some(level.build_grid(&self.ids));
        self.current_level_number = level.level_number;
        self.level = Some(level.clone());
        self.move_count = 0;
        self.is_normalizing = false;
        info!(
            level = level.level_number,
            rows = level.rows,
            columns = level.columns,
            blocks = level.blocks.len(),
            "level initialized"
        );
    }

    /// Rebuild the grid from a snapshot, keeping persisted block ids.
    /// `level` is kept so the level can be restarted later.
    pub fn restore_level_state(&mut self, snapshot: &LevelStateProfileData, level: Level) {
        self.grid = Some(snapshot.build_grid(&self.ids));
        self.current_level_number = snapshot.level_number;
        self.level = Some(level);
        self.move_count = 0;
        self.is_normalizing = false;
        info!(
            level = snapshot.level_number,
            blocks = snapshot.blocks.len(),
            "level state restored"
        );
    }

    pub fn increment_move_count(&mut self) {
        self.move_count += 1;
    }

    pub fn reset_move_count(&mut self) {
        self.move_count = 0;
    }

    /// True once a loaded grid has no blocks left
    pub fn is_level_complete(&self) -> bool {
        self.grid.as_ref().is_some_and(Grid::is_grid_empty)
    }

    pub fn create_normalization_engine(&mut self, min_match_length: usize) {
        self.normalization_engine = NormalizationEngine::new(min_match_length);
    }

    /// Snapshot of the current grid, if one is loaded
    pub fn level_state(&self) -> Option<LevelStateProfileData> {
        self.grid
            .as_ref()
            .map(|grid| LevelStateProfileData::capture(self.current_level_number, grid))
    }

    /// Full profile to persist; `None` until both a grid and a level exist
    pub fn profile(&self) -> Option<GameStateProfileData> {
        self.level.as_ref()?;
        Some(GameStateProfileData {
            current_level_number: self.current_level_number,
            current_level_state: Some(self.level_state()?),
        })
    }
}

/// Shared handle to the session state and its persistence
#[derive(Clone)]
pub struct GameStateManager {
    state: Arc<Mutex<SessionState>>,
    persistence: Arc<dyn Persistence>,
}

impl GameStateManager {
    /// Persistence is required; there is no silent fallback
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self::with_allocator(persistence, Arc::new(BlockIdAllocator::new()))
    }

    pub fn with_allocator(persistence: Arc<dyn Persistence>, ids: Arc<BlockIdAllocator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(ids))),
            persistence,
        }
    }

    /// Lock the session. Do not hold the guard across an await.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initialize_level(&self, level: &Level) {
        self.lock().initialize_level(level);
    }

    pub fn restore_level_state(&self, snapshot: &LevelStateProfileData, level: Level) {
        self.lock().restore_level_state(snapshot, level);
    }

    pub fn increment_move_count(&self) {
        self.lock().increment_move_count();
    }

    pub fn reset_move_count(&self) {
        self.lock().reset_move_count();
    }

    pub fn create_normalization_engine(&self, min_match_length: usize) {
        self.lock().create_normalization_engine(min_match_length);
    }

    pub fn is_level_complete(&self) -> bool {
        self.lock().is_level_complete()
    }

    pub fn is_normalizing(&self) -> bool {
        self.lock().is_normalizing()
    }

    pub fn set_normalizing(&self, value: bool) {
        self.lock().set_normalizing(value);
    }

    pub fn current_level_number(&self) -> u32 {
        self.lock().current_level_number()
    }

    pub fn move_count(&self) -> u32 {
        self.lock().move_count()
    }

    pub fn has_grid(&self) -> bool {
        self.lock().grid().is_some()
    }

    pub fn current_level(&self) -> Option<Level> {
        self.lock().level().cloned()
    }

    /// Clone of the current grid
    pub fn grid_snapshot(&self) -> Option<Grid> {
        self.lock().grid().cloned()
    }

    pub fn level_state(&self) -> Option<LevelStateProfileData> {
        self.lock().level_state()
    }

    /// Persist the current grid and level number. No-op when nothing is loaded.
    pub async fn save_state(&self) -> Result<(), PersistenceError> {
        let profile = self.lock().profile();
        let Some(profile) = profile else {
            debug!("save skipped: no level loaded");
            return Ok(());
        };
        self.persistence.save_game_state(profile).await
    }

    pub async fn load_state(&self) -> Result<GameStateProfileData, PersistenceError> {
        self.persistence.load_game_state().await
    }

    pub fn has_saved_state(&self) -> bool {
        self.persistence.has_saved_state()
    }
}

impl std::fmt::Debug for GameStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStateManager")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}
