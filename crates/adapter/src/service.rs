//! Application service - one playable session
//!
//! [`MatchPuzzleService`] wires the collaborators together: it resolves
//! levels, validates gestures, submits commands to the queue, chains
//! normalization behind every move, advances to the next level once a grid
//! is cleared, and saves progress.
//!
//! Presentation is optional. A [`PresentationHooks`] implementation receives
//! lifecycle notifications and supplies the animation futures commands await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::core::{Block, BlockMove, Level};
use crate::engine::{
    callbacks, AsyncHookFn, BlockDestroyFn, BlockFallFn, BlockMovedFn, BoxFuture, CommandQueue,
    EventBus, GameStateManager, HookFn, MatchSettings, MoveCommand, NormalizeGridCommand,
    Persistence, RestartLevelCommand, SwipeCommand, SwitchLevelCommand,
};
use crate::error::{LevelError, ServiceError};
use crate::levels::{JsonLevelRepository, LevelSource};
use crate::persistence::JsonFilePersistence;
use crate::types::{Direction, GridPosition, InvalidMoveAttempt, FIRST_LEVEL_NUMBER};

const SOURCE_OUT_OF_BOUNDS: &str = "Source position out of bounds";
const NO_BLOCK_AT_SOURCE: &str = "No block at source position";
const BLOCK_CANNOT_INTERACT: &str = "Block cannot interact";
const TARGET_OUT_OF_BOUNDS: &str = "Target position out of bounds";

fn settled() -> BoxFuture<'static, ()> {
    Box::pin(std::future::ready(()))
}

/// Presentation side of a session. Every method has a no-op default.
pub trait PresentationHooks: Send + Sync {
    fn on_level_switched(&self) {}

    fn on_level_restarted(&self) {}

    /// The grid is stable again after a move
    fn on_normalization_completed(&self) {}

    /// A block moved or was swapped away from `old_position`
    fn on_block_moved(&self, _block: Block, _old_position: GridPosition) -> BoxFuture<'static, ()> {
        settled()
    }

    fn on_block_fall(&self, _step: BlockMove) -> BoxFuture<'static, ()> {
        settled()
    }

    fn on_block_destroy(&self, _block: Block) -> BoxFuture<'static, ()> {
        settled()
    }
}

/// No presentation attached
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl PresentationHooks for Headless {}

/// Map any level number onto `1..=count`
pub fn wrap_level_number(level_number: u32, count: usize) -> u32 {
    let count = u32::try_from(count).unwrap_or(u32::MAX).max(1);
    level_number.saturating_sub(1) % count + 1
}

struct Inner {
    state: GameStateManager,
    events: Arc<EventBus>,
    queue: CommandQueue,
    levels: Arc<dyn LevelSource>,
    presentation: Arc<dyn PresentationHooks>,
    settings: MatchSettings,
    autosave: bool,
    disposed: AtomicBool,
}

/// Configures and creates a [`MatchPuzzleService`]
pub struct ServiceBuilder {
    persistence: Arc<dyn Persistence>,
    levels: Arc<dyn LevelSource>,
    presentation: Arc<dyn PresentationHooks>,
    events: Arc<EventBus>,
    settings: MatchSettings,
    autosave: bool,
}

impl ServiceBuilder {
    pub fn presentation(mut self, presentation: Arc<dyn PresentationHooks>) -> Self {
        self.presentation = presentation;
        self
    }

    /// Share an existing bus, e.g. to subscribe before the first level loads
    pub fn event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn settings(mut self, settings: MatchSettings) -> Self {
        self.settings = settings.clamped();
        self
    }

    pub fn autosave(mut self, enabled: bool) -> Self {
        self.autosave = enabled;
        self
    }

    /// Must be called from within a tokio runtime
    pub fn build(self) -> Result<MatchPuzzleService, ServiceError> {
        let queue = CommandQueue::new()?;
        let state = GameStateManager::new(self.persistence);
        state.create_normalization_engine(self.settings.effective_min_match_length());

        Ok(MatchPuzzleService {
            inner: Arc::new(Inner {
                state,
                events: self.events,
                queue,
                levels: self.levels,
                presentation: self.presentation,
                settings: self.settings,
                autosave: self.autosave,
                disposed: AtomicBool::new(false),
            }),
        })
    }
}

/// Cheap-to-clone handle to a running session
#[derive(Clone)]
pub struct MatchPuzzleService {
    inner: Arc<Inner>,
}

impl MatchPuzzleService {
    pub fn builder(
        persistence: Arc<dyn Persistence>,
        levels: Arc<dyn LevelSource>,
    ) -> ServiceBuilder {
        ServiceBuilder {
            persistence,
            levels,
            presentation: Arc::new(Headless),
            events: Arc::new(EventBus::new()),
            settings: MatchSettings::default(),
            autosave: true,
        }
    }

    /// File-backed session: levels from `config.levels_dir`, saves to
    /// `config.save_path`
    pub async fn from_config(
        config: &ServiceConfig,
        settings: MatchSettings,
    ) -> Result<ServiceBuilder, ServiceError> {
        let levels = JsonLevelRepository::open(&config.levels_dir, config.level_cache_size).await?;
        let persistence = JsonFilePersistence::new(&config.save_path);
        Ok(Self::builder(Arc::new(persistence), Arc::new(levels))
            .settings(settings)
            .autosave(config.autosave))
    }

    pub fn state(&self) -> &GameStateManager {
        &self.inner.state
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.inner.queue
    }

    pub fn settings(&self) -> MatchSettings {
        self.inner.settings
    }

    /// Resume the saved session, or start from the first level
    #[instrument(skip(self))]
    pub async fn start_game(&self) -> Result<(), ServiceError> {
        let state = &self.inner.state;
        if !state.has_saved_state() {
            info!("no saved game, starting from the first level");
            return self.load_level(FIRST_LEVEL_NUMBER).await;
        }

        let profile = state.load_state().await?;
        let Some(snapshot) = profile.current_level_state else {
            return self.load_level(profile.current_level_number).await;
        };

        let level = match snapshot.validate() {
            Ok(()) => self.resolve_level(profile.current_level_number).await,
            Err(reason) => Err(LevelError::Invalid {
                level: snapshot.level_number,
                reason,
            }),
        };
        match level {
            Ok(level) => {
                state.restore_level_state(&snapshot, level);
                state.create_normalization_engine(self.inner.settings.effective_min_match_length());
                self.inner.presentation.on_level_switched();
                info!(level = snapshot.level_number, "saved game resumed");
                Ok(())
            }
            Err(err) => {
                error!(
                    level = profile.current_level_number,
                    %err,
                    "saved level unavailable, starting from the first level"
                );
                self.load_level(FIRST_LEVEL_NUMBER).await
            }
        }
    }

    /// Switch to a level (numbers wrap around the level count), wait for the
    /// switch to finish, then save
    #[instrument(skip(self))]
    pub async fn load_level(&self, level_number: u32) -> Result<(), ServiceError> {
        let level = self.resolve_level(level_number).await?;
        let resolved = level.level_number;

        let command = SwitchLevelCommand::new(
            self.inner.state.clone(),
            Arc::clone(&self.inner.events),
            Some(level),
        )
        .on_level_switched(self.level_switched_hook());

        if !self.inner.queue.enqueue(command) {
            warn!(level = resolved, "level switch rejected");
        }
        self.inner.queue.wait_for_completion().await;
        debug!(requested = level_number, level = resolved, "level loaded");

        self.save_game().await
    }

    pub async fn load_next_level(&self) -> Result<(), ServiceError> {
        let next = self.inner.state.current_level_number().saturating_add(1);
        self.load_level(next).await
    }

    /// Returns false if no level is loaded
    pub fn restart_level(&self) -> bool {
        let state = self.inner.state.clone();
        let presentation = Arc::clone(&self.inner.presentation);
        let min_match_length = self.inner.settings.effective_min_match_length();
        let restarted = callbacks::hook(move || {
            state.create_normalization_engine(min_match_length);
            presentation.on_level_restarted();
        });

        let command =
            RestartLevelCommand::new(self.inner.state.clone(), Arc::clone(&self.inner.events))
                .on_level_restarted(restarted);
        self.inner.queue.enqueue(command)
    }

    /// Submit a gesture. An empty target moves the block, an occupied one
    /// swaps the two. Returns true if a command was queued.
    pub fn move_block(&self, position: GridPosition, direction: Direction) -> bool {
        let target_empty = {
            let state = self.inner.state.lock();
            let Some(grid) = state.grid() else {
                warn!(%position, %direction, "move ignored: no level loaded");
                return false;
            };

            if !grid.is_valid_position(position) {
                Err(SOURCE_OUT_OF_BOUNDS)
            } else {
                match grid.get(position) {
                    None => Err(NO_BLOCK_AT_SOURCE),
                    Some(block) if !block.can_interact() => Err(BLOCK_CANNOT_INTERACT),
                    Some(_) => grid
                        .neighbor(position, direction)
                        .map(|target| grid.is_empty(target))
                        .ok_or(TARGET_OUT_OF_BOUNDS),
                }
            }
        };

        let queued = match target_empty {
            Err(reason) => {
                debug!(%position, %direction, reason, "invalid move");
                self.inner.events.publish(InvalidMoveAttempt {
                    position,
                    direction,
                    reason: reason.to_string(),
                });
                return false;
            }
            Ok(true) => self.inner.queue.enqueue(
                MoveCommand::new(
                    self.inner.state.clone(),
                    Arc::clone(&self.inner.events),
                    position,
                    direction,
                )
                .on_block_moved(self.block_moved_fn())
                .on_normalization_needed(self.normalization_trigger()),
            ),
            Ok(false) => self.inner.queue.enqueue(
                SwipeCommand::new(
                    self.inner.state.clone(),
                    Arc::clone(&self.inner.events),
                    position,
                    direction,
                )
                .on_block_moved(self.block_moved_fn())
                .on_normalization_needed(self.normalization_trigger()),
            ),
        };

        if !queued {
            debug!(%position, %direction, "gesture rejected by command");
        }
        queued
    }

    pub async fn save_game(&self) -> Result<(), ServiceError> {
        Ok(self.inner.state.save_state().await?)
    }

    /// Resolves once no command is queued or running
    pub async fn wait_idle(&self) {
        self.inner.queue.wait_for_completion().await;
    }

    /// Drop pending commands, subscribers, and cached levels. Deferred level
    /// advances scheduled before this call are cancelled.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        self.inner.queue.clear();
        self.inner.events.clear();
        self.inner.levels.clear_cache();
        debug!("service disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    async fn resolve_level(&self, level_number: u32) -> Result<Level, LevelError> {
        let count = self.inner.levels.level_count();
        if count == 0 {
            return Err(LevelError::NoLevelsConfigured);
        }
        self.inner
            .levels
            .load_level(wrap_level_number(level_number, count))
            .await
    }

    fn level_switched_hook(&self) -> HookFn {
        let state = self.inner.state.clone();
        let presentation = Arc::clone(&self.inner.presentation);
        let min_match_length = self.inner.settings.effective_min_match_length();
        callbacks::hook(move || {
            state.create_normalization_engine(min_match_length);
            presentation.on_level_switched();
        })
    }

    fn block_moved_fn(&self) -> BlockMovedFn {
        let presentation = Arc::clone(&self.inner.presentation);
        Arc::new(move |block, old_position| presentation.on_block_moved(block, old_position))
    }

    fn block_fall_fn(&self) -> BlockFallFn {
        let presentation = Arc::clone(&self.inner.presentation);
        Arc::new(move |step| presentation.on_block_fall(step))
    }

    fn block_destroy_fn(&self) -> BlockDestroyFn {
        let presentation = Arc::clone(&self.inner.presentation);
        Arc::new(move |block| presentation.on_block_destroy(block))
    }

    /// Queues a normalization behind the command that fires it
    fn normalization_trigger(&self) -> AsyncHookFn {
        let service = self.clone();
        callbacks::async_hook(move || {
            service.enqueue_normalization();
            std::future::ready(())
        })
    }

    fn enqueue_normalization(&self) -> bool {
        let service = self.clone();
        let command = NormalizeGridCommand::new(
            self.inner.state.clone(),
            Arc::clone(&self.inner.events),
            self.inner.settings,
        )
        .on_block_fall(self.block_fall_fn())
        .on_block_destroy(self.block_destroy_fn())
        .on_complete(callbacks::hook(move || service.normalization_completed()));

        self.inner.queue.enqueue(command)
    }

    fn normalization_completed(&self) {
        self.inner.presentation.on_normalization_completed();

        if self.inner.state.is_level_complete() {
            let service = self.clone();
            let delay = self.inner.settings.next_level_delay();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if service.is_disposed() {
                    return;
                }
                if let Err(err) = service.load_next_level().await {
                    error!(%err, "failed to advance to the next level");
                }
            });
        } else if self.inner.autosave {
            let state = self.inner.state.clone();
            tokio::spawn(async move {
                if let Err(err) = state.save_state().await {
                    warn!(%err, "background save failed");
                }
            });
        }
    }
}

impl std::fmt::Debug for MatchPuzzleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchPuzzleService")
            .field("queue", &self.inner.queue)
            .field("settings", &self.inner.settings)
            .field("autosave", &self.inner.autosave)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockStateProfileData, GameStateProfileData, LevelStateProfileData};
    use crate::levels::InMemoryLevels;
    use crate::persistence::MemoryPersistence;
    use crate::types::{BlockId, BlockTypeId, EventKind, GameEvent};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct CountingPresentation {
        switched: AtomicUsize,
        restarted: AtomicUsize,
        normalized: AtomicUsize,
        moved: AtomicUsize,
    }

    impl PresentationHooks for CountingPresentation {
        fn on_level_switched(&self) {
            self.switched.fetch_add(1, Ordering::SeqCst);
        }

        fn on_level_restarted(&self) {
            self.restarted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_normalization_completed(&self) {
            self.normalized.fetch_add(1, Ordering::SeqCst);
        }

        fn on_block_moved(&self, _block: Block, _old: GridPosition) -> BoxFuture<'static, ()> {
            self.moved.fetch_add(1, Ordering::SeqCst);
            settled()
        }
    }

    /// Level 1: `a a _ a` in one row. Level 2: two rows with a lone block.
    fn levels() -> InMemoryLevels {
        InMemoryLevels::new(vec![
            Level::new(1, 1, 4)
                .with_block("a", 0, 0)
                .with_block("a", 0, 1)
                .with_block("a", 0, 3),
            Level::new(2, 2, 2).with_block("b", 0, 0),
            Level::new(3, 1, 3).with_block("c", 0, 0).with_block("d", 0, 1),
        ])
    }

    fn service_with(
        persistence: Arc<MemoryPersistence>,
        levels: InMemoryLevels,
    ) -> MatchPuzzleService {
        MatchPuzzleService::builder(persistence, Arc::new(levels))
            .settings(MatchSettings::instant())
            .build()
            .unwrap()
    }

    fn record(service: &MatchPuzzleService) -> mpsc::UnboundedReceiver<GameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        service.events().subscribe_all(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GameEvent>) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn wait_for_level(rx: &mut mpsc::UnboundedReceiver<GameEvent>, level_number: u32) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = rx.recv().await {
                if let GameEvent::LevelStarted(started) = event {
                    if started.level_number == level_number {
                        return;
                    }
                }
            }
        })
        .await
        .expect("level did not start in time");
    }

    #[test]
    fn test_wrap_level_number() {
        assert_eq!(wrap_level_number(1, 3), 1);
        assert_eq!(wrap_level_number(3, 3), 3);
        assert_eq!(wrap_level_number(4, 3), 1);
        assert_eq!(wrap_level_number(5, 3), 2);
        assert_eq!(wrap_level_number(0, 3), 1);
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = MatchPuzzleService::builder(
            Arc::new(MemoryPersistence::new()),
            Arc::new(levels()),
        )
        .build();
        assert!(matches!(result, Err(ServiceError::Engine(_))));
    }

    #[tokio::test]
    async fn test_start_without_save_loads_first_level() {
        let persistence = Arc::new(MemoryPersistence::new());
        let service = service_with(Arc::clone(&persistence), levels());
        let mut rx = record(&service);

        service.start_game().await.unwrap();

        assert_eq!(service.state().current_level_number(), 1);
        assert_eq!(service.state().grid_snapshot().unwrap().block_count(), 3);
        let kinds: Vec<EventKind> = drain(&mut rx).iter().map(GameEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::LevelStarted]);
        assert!(persistence.has_saved_state());
    }

    #[tokio::test]
    async fn test_load_level_wraps_around() {
        let service = service_with(Arc::new(MemoryPersistence::new()), levels());
        service.load_level(5).await.unwrap();
        assert_eq!(service.state().current_level_number(), 2);

        service.load_level(3).await.unwrap();
        service.load_next_level().await.unwrap();
        assert_eq!(service.state().current_level_number(), 1);
    }

    #[tokio::test]
    async fn test_no_levels_configured() {
        let service = service_with(Arc::new(MemoryPersistence::new()), InMemoryLevels::default());
        assert!(matches!(
            service.start_game().await,
            Err(ServiceError::Level(LevelError::NoLevelsConfigured))
        ));
    }

    #[tokio::test]
    async fn test_resume_saved_game_keeps_ids() {
        let profile = GameStateProfileData {
            current_level_number: 3,
            current_level_state: Some(LevelStateProfileData {
                level_number: 3,
                rows: 1,
                columns: 3,
                blocks: vec![BlockStateProfileData {
                    id: 42,
                    block_type: BlockTypeId::new("c"),
                    row: 0,
                    column: 2,
                }],
            }),
        };
        let persistence = Arc::new(MemoryPersistence::with_profile(&profile).unwrap());
        let presentation = Arc::new(CountingPresentation::default());
        let service = MatchPuzzleService::builder(persistence, Arc::new(levels()))
            .settings(MatchSettings::instant())
            .presentation(presentation.clone())
            .build()
            .unwrap();

        service.start_game().await.unwrap();

        let grid = service.state().grid_snapshot().unwrap();
        assert_eq!(service.state().current_level_number(), 3);
        assert_eq!(grid.block_count(), 1);
        assert_eq!(grid.get(GridPosition::new(0, 2)).unwrap().id(), BlockId::new(42));
        assert_eq!(presentation.switched.load(Ordering::SeqCst), 1);

        // The level definition was looked up, so restarting rebuilds it
        assert!(service.restart_level());
        service.wait_idle().await;
        let grid = service.state().grid_snapshot().unwrap();
        assert_eq!(grid.block_count(), 2);
        assert!(grid.get(GridPosition::new(0, 0)).unwrap().id().get() > 42);
        assert_eq!(presentation.restarted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_with_missing_level_falls_back() {
        let profile = GameStateProfileData {
            current_level_number: 2,
            current_level_state: Some(LevelStateProfileData {
                level_number: 2,
                rows: 1,
                columns: 1,
                blocks: Vec::new(),
            }),
        };
        let persistence = Arc::new(MemoryPersistence::with_profile(&profile).unwrap());
        let levels = InMemoryLevels::new(vec![Level::new(1, 1, 1), Level::new(3, 1, 1)]);
        let service = service_with(persistence, levels);

        service.start_game().await.unwrap();
        assert_eq!(service.state().current_level_number(), 1);
    }

    #[tokio::test]
    async fn test_resume_with_oversized_state_falls_back() {
        let profile = GameStateProfileData {
            current_level_number: 2,
            current_level_state: Some(LevelStateProfileData {
                level_number: 2,
                rows: usize::MAX,
                columns: 3,
                blocks: Vec::new(),
            }),
        };
        let persistence = Arc::new(MemoryPersistence::with_profile(&profile).unwrap());
        let service = service_with(Arc::clone(&persistence), levels());

        service.start_game().await.unwrap();

        assert_eq!(service.state().current_level_number(), 1);
        assert_eq!(service.state().grid_snapshot().unwrap().rows(), 1);
        let saved = persistence.load_game_state().await.unwrap();
        assert_eq!(saved.current_level_state.unwrap().rows, 1);
    }

    #[tokio::test]
    async fn test_invalid_level_is_reported_and_keeps_session() {
        let levels = InMemoryLevels::new(vec![
            Level::new(1, 1, 2).with_block("a", 0, 0),
            Level::new(2, usize::MAX, 2),
        ]);
        let service = service_with(Arc::new(MemoryPersistence::new()), levels);
        service.load_level(1).await.unwrap();

        let err = service.load_level(2).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Level(LevelError::Invalid { level: 2, .. })
        ));
        assert_eq!(service.state().current_level_number(), 1);
        assert_eq!(service.state().grid_snapshot().unwrap().block_count(), 1);
    }

    #[tokio::test]
    async fn test_resume_without_level_state_loads_saved_number() {
        let profile = GameStateProfileData {
            current_level_number: 2,
            current_level_state: None,
        };
        let persistence = Arc::new(MemoryPersistence::with_profile(&profile).unwrap());
        let service = service_with(persistence, levels());

        service.start_game().await.unwrap();
        assert_eq!(service.state().current_level_number(), 2);
    }

    #[tokio::test]
    async fn test_invalid_gestures_publish_reasons() {
        let service = service_with(Arc::new(MemoryPersistence::new()), levels());
        assert!(!service.move_block(GridPosition::new(0, 0), Direction::Right));

        service.start_game().await.unwrap();
        let mut rx = record(&service);

        assert!(!service.move_block(GridPosition::new(5, 0), Direction::Left));
        assert!(!service.move_block(GridPosition::new(0, 2), Direction::Left));
        assert!(!service.move_block(GridPosition::new(0, 0), Direction::Left));
        assert!(!service.move_block(GridPosition::new(0, 3), Direction::Down));

        let reasons: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                GameEvent::InvalidMoveAttempt(attempt) => Some(attempt.reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                SOURCE_OUT_OF_BOUNDS,
                NO_BLOCK_AT_SOURCE,
                TARGET_OUT_OF_BOUNDS,
                TARGET_OUT_OF_BOUNDS,
            ]
        );
    }

    #[tokio::test]
    async fn test_busy_block_cannot_interact() {
        let service = service_with(Arc::new(MemoryPersistence::new()), levels());
        service.start_game().await.unwrap();
        {
            let mut state = service.state().lock();
            let grid = state.grid_mut().unwrap();
            grid.get_mut(GridPosition::new(0, 0)).unwrap().is_falling = true;
        }
        let mut rx = record(&service);

        assert!(!service.move_block(GridPosition::new(0, 0), Direction::Right));
        match drain(&mut rx).as_slice() {
            [GameEvent::InvalidMoveAttempt(attempt)] => {
                assert_eq!(attempt.reason, BLOCK_CANNOT_INTERACT);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_swipe_then_autosave() {
        let persistence = Arc::new(MemoryPersistence::new());
        let presentation = Arc::new(CountingPresentation::default());
        let service = MatchPuzzleService::builder(persistence.clone(), Arc::new(levels()))
            .settings(MatchSettings::instant())
            .presentation(presentation.clone())
            .build()
            .unwrap();
        service.load_level(3).await.unwrap();

        // c d _  ->  d c _
        assert!(service.move_block(GridPosition::new(0, 0), Direction::Right));
        service.wait_idle().await;

        let grid = service.state().grid_snapshot().unwrap();
        assert_eq!(grid.get(GridPosition::new(0, 0)).unwrap().block_type().as_str(), "d");
        assert_eq!(grid.get(GridPosition::new(0, 1)).unwrap().block_type().as_str(), "c");
        assert_eq!(service.state().move_count(), 1);
        assert_eq!(presentation.moved.load(Ordering::SeqCst), 2);
        assert_eq!(presentation.normalized.load(Ordering::SeqCst), 1);

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let profile = persistence.load_game_state().await.unwrap();
                let swapped = profile.current_level_state.is_some_and(|level| {
                    level
                        .blocks
                        .iter()
                        .any(|b| b.column == 0 && b.block_type.as_str() == "d")
                });
                if swapped {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("background save did not land");
    }

    #[tokio::test]
    async fn test_clearing_grid_advances_level() {
        let service = service_with(Arc::new(MemoryPersistence::new()), levels());
        service.start_game().await.unwrap();
        let mut rx = record(&service);

        // a a _ a  ->  a a a _  -> cleared
        assert!(service.move_block(GridPosition::new(0, 3), Direction::Left));
        wait_for_level(&mut rx, 2).await;
        service.wait_idle().await;

        assert_eq!(service.state().current_level_number(), 2);
        assert_eq!(service.state().move_count(), 0);
    }

    #[tokio::test]
    async fn test_level_completion_events() {
        let service = service_with(Arc::new(MemoryPersistence::new()), levels());
        service.start_game().await.unwrap();
        let mut rx = record(&service);

        assert!(service.move_block(GridPosition::new(0, 3), Direction::Left));
        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = rx.recv().await {
                let done = matches!(event, GameEvent::LevelStarted(_));
                seen.push(event.kind());
                if done {
                    break;
                }
            }
        })
        .await
        .expect("level did not advance");

        assert_eq!(
            seen,
            vec![
                EventKind::MoveExecuted,
                EventKind::BlocksMatched,
                EventKind::BlocksDestroyed,
                EventKind::LevelCompleted,
                EventKind::LevelStarted,
            ]
        );
    }

    #[tokio::test]
    async fn test_dispose_cancels_level_advance() {
        let service = MatchPuzzleService::builder(
            Arc::new(MemoryPersistence::new()),
            Arc::new(levels()),
        )
        .settings(MatchSettings {
            next_level_delay_ms: 50,
            ..MatchSettings::instant()
        })
        .build()
        .unwrap();
        service.start_game().await.unwrap();

        assert!(service.move_block(GridPosition::new(0, 3), Direction::Left));
        service.wait_idle().await;
        assert!(service.state().is_level_complete());

        service.dispose();
        assert_eq!(service.events().subscriber_count(), 0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(service.state().current_level_number(), 1);
    }
}
