use std::sync::Arc;

use tracing::debug;

use crate::callbacks::HookFn;
use crate::event_bus::EventBus;
use crate::state::GameStateManager;

use super::switch_level::reinitialize;

/// Rebuild the current level from its definition
pub struct RestartLevelCommand {
    state: GameStateManager,
    events: Arc<EventBus>,
    on_level_restarted: Option<HookFn>,
}

impl RestartLevelCommand {
    pub fn new(state: GameStateManager, events: Arc<EventBus>) -> Self {
        Self {
            state,
            events,
            on_level_restarted: None,
        }
    }

    pub fn on_level_restarted(mut self, callback: HookFn) -> Self {
        self.on_level_restarted = Some(callback);
        self
    }

    pub fn can_execute(&self) -> bool {
        if self.state.current_level().is_none() {
            debug!("cannot restart: no level loaded");
            return false;
        }
        true
    }

    pub async fn execute(self) {
        let Some(level) = self.state.current_level() else {
            debug!("cannot restart: no level loaded");
            return;
        };
        reinitialize(
            &self.state,
            &self.events,
            &level,
            self.on_level_restarted.as_ref(),
        )
        .await;
    }
}
