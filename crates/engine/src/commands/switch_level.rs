use std::sync::Arc;

use tracing::debug;

use crate::callbacks::HookFn;
use crate::core::Level;
use crate::event_bus::EventBus;
use crate::state::GameStateManager;
use crate::types::LevelStarted;

/// Replace the session with a fresh copy of `level`
pub struct SwitchLevelCommand {
    state: GameStateManager,
    events: Arc<EventBus>,
    level: Option<Level>,
    on_level_switched: Option<HookFn>,
}

impl SwitchLevelCommand {
    /// A missing level makes the command invalid
    pub fn new(state: GameStateManager, events: Arc<EventBus>, level: Option<Level>) -> Self {
        Self {
            state,
            events,
            level,
            on_level_switched: None,
        }
    }

    /// Called right after the new grid is built, before `LevelStarted`
    pub fn on_level_switched(mut self, callback: HookFn) -> Self {
        self.on_level_switched = Some(callback);
        self
    }

    pub fn can_execute(&self) -> bool {
        if self.level.is_none() {
            debug!("cannot switch level: no level given");
            return false;
        }
        true
    }

    pub async fn execute(self) {
        let Some(level) = self.level else {
            return;
        };
        reinitialize(&self.state, &self.events, &level, self.on_level_switched.as_ref()).await;
    }
}

/// Wait out any normalization in flight, then rebuild the session from
/// `level`, notify, and announce the start
pub(super) async fn reinitialize(
    state: &GameStateManager,
    events: &EventBus,
    level: &Level,
    callback: Option<&HookFn>,
) {
    while state.is_normalizing() {
        tokio::task::yield_now().await;
    }

    state.initialize_level(level);
    if let Some(callback) = callback {
        callback();
    }
    events.publish(LevelStarted {
        level_number: level.level_number,
    });

    tokio::task::yield_now().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::hook;
    use crate::state::test_support::{manager, row_level};
    use crate::types::GridPosition;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_switch_builds_grid_and_publishes() {
        let (state, _) = manager();
        let events = Arc::new(EventBus::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        events.subscribe_all(move |e| sink.lock().unwrap().push(e.to_string()));
        let hook_log = Arc::clone(&order);

        let mut level = row_level(&["a", "b"]);
        level.level_number = 7;
        SwitchLevelCommand::new(state.clone(), events, Some(level))
            .on_level_switched(hook(move || hook_log.lock().unwrap().push("switched".into())))
            .execute()
            .await;

        assert_eq!(state.current_level_number(), 7);
        assert_eq!(state.grid_snapshot().unwrap().block_count(), 2);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["switched".to_string(), "level 7 started".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_level_is_rejected() {
        let (state, _) = manager();
        let cmd = SwitchLevelCommand::new(state.clone(), Arc::new(EventBus::new()), None);
        assert!(!cmd.can_execute());
        cmd.execute().await;
        assert!(!state.has_grid());
    }

    #[tokio::test]
    async fn test_waits_for_normalization_to_finish() {
        let (state, _) = manager();
        state.initialize_level(&row_level(&["a"]));
        state.set_normalizing(true);

        let releaser = state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            releaser.set_normalizing(false);
        });

        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.subscribe::<LevelStarted, _>(move |e| sink.lock().unwrap().push(e.clone()));

        let start = tokio::time::Instant::now();
        SwitchLevelCommand::new(state.clone(), events, Some(row_level(&["", "b"])))
            .execute()
            .await;

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(state.grid_snapshot().unwrap().get(GridPosition::new(0, 1)).is_some());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
