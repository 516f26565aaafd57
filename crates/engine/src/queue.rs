//! Command queue - single-consumer FIFO
//!
//! At most one command executes at a time, in submission order. Enqueuing
//! while idle spawns a consumer task on the runtime the queue was created
//! in; enqueuing while busy only appends. The consumer exits as soon as the
//! queue is empty.
//!
//! Commands are validated twice: on enqueue (invalid ones are dropped) and
//! again right before execution, since commands queued behind others may
//! have been invalidated in the meantime.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::debug;

use crate::commands::Command;
use crate::error::EngineError;

#[derive(Default)]
struct Pending {
    commands: VecDeque<Command>,
    processing: bool,
}

struct Inner {
    pending: Mutex<Pending>,
    /// `true` while a consumer is running
    busy: watch::Sender<bool>,
    runtime: Handle,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_idle(&self, pending: &mut Pending) {
        pending.processing = false;
        self.busy.send_replace(false);
    }
}

/// Marks the queue idle if the consumer unwinds mid-command
struct ConsumerGuard {
    inner: Arc<Inner>,
    armed: bool,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        if self.armed {
            let mut pending = self.inner.lock();
            self.inner.set_idle(&mut pending);
        }
    }
}

/// Cheap-to-clone handle to the shared queue
#[derive(Clone)]
pub struct CommandQueue {
    inner: Arc<Inner>,
}

impl CommandQueue {
    /// Must be called from within a tokio runtime
    pub fn new() -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        Ok(Self::with_handle(runtime))
    }

    pub fn with_handle(runtime: Handle) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(Pending::default()),
                busy,
                runtime,
            }),
        }
    }

    /// Queue a command. Returns false if it was discarded as not executable.
    pub fn enqueue(&self, command: impl Into<Command>) -> bool {
        let command = command.into();
        if !command.can_execute() {
            debug!(command = command.name(), "discarded on enqueue");
            return false;
        }

        let mut pending = self.inner.lock();
        pending.commands.push_back(command);
        if !pending.processing {
            pending.processing = true;
            self.inner.busy.send_replace(true);
            self.inner.runtime.spawn(consume(Arc::clone(&self.inner)));
        }
        true
    }

    /// Resolves once the queue has drained and the consumer stopped.
    /// Resolves immediately when already idle.
    pub async fn wait_for_completion(&self) {
        let mut busy = self.inner.busy.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    /// Drop every pending command. A command already executing is not
    /// interrupted; waiters resolve when it finishes.
    pub fn clear(&self) {
        let mut pending = self.inner.lock();
        let dropped = pending.commands.len();
        pending.commands.clear();
        if dropped > 0 {
            debug!(dropped, "cleared pending commands");
        }
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().processing
    }

    /// Commands waiting to start
    pub fn len(&self) -> usize {
        self.inner.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.inner.lock();
        f.debug_struct("CommandQueue")
            .field("pending", &pending.commands.len())
            .field("processing", &pending.processing)
            .finish()
    }
}

async fn consume(inner: Arc<Inner>) {
    let mut guard = ConsumerGuard {
        inner: Arc::clone(&inner),
        armed: true,
    };

    loop {
        let next = {
            let mut pending = inner.lock();
            match pending.commands.pop_front() {
                Some(command) => command,
                None => {
                    inner.set_idle(&mut pending);
                    guard.armed = false;
                    return;
                }
            }
        };

        if next.can_execute() {
            debug!(command = next.name(), "executing");
            next.execute().await;
        } else {
            debug!(command = next.name(), "skipped: no longer executable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{async_hook, block_moved, hook};
    use crate::commands::{MoveCommand, RestartLevelCommand, SwitchLevelCommand};
    use crate::event_bus::EventBus;
    use crate::state::test_support::{manager, row_level};
    use crate::types::{Direction, GridPosition};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_new_outside_runtime_fails() {
        assert!(matches!(CommandQueue::new(), Err(EngineError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_wait_when_idle_resolves_immediately() {
        let queue = CommandQueue::new().unwrap();
        let mut wait = task::spawn(queue.wait_for_completion());
        assert_ready!(wait.poll());
        assert!(!queue.is_processing());
    }

    #[tokio::test]
    async fn test_invalid_command_is_discarded() {
        let queue = CommandQueue::new().unwrap();
        let (state, _) = manager();
        let accepted = queue.enqueue(RestartLevelCommand::new(state, Arc::new(EventBus::new())));
        assert!(!accepted);
        assert!(!queue.is_processing());
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_run_in_submission_order() {
        let queue = CommandQueue::new().unwrap();
        let (state, _) = manager();
        let events = Arc::new(EventBus::new());
        state.initialize_level(&row_level(&["a", "", "b", ""]));
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = Arc::clone(&log);
        let slow = MoveCommand::new(state.clone(), events.clone(), GridPosition::new(0, 0), Direction::Right)
            .on_block_moved(block_moved(move |_, _| {
                let log = Arc::clone(&slow_log);
                async move {
                    log.lock().unwrap().push("slow:start");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    log.lock().unwrap().push("slow:end");
                }
            }));
        let fast_log = Arc::clone(&log);
        let fast = MoveCommand::new(state.clone(), events, GridPosition::new(0, 2), Direction::Right)
            .on_block_moved(block_moved(move |_, _| {
                let log = Arc::clone(&fast_log);
                async move { log.lock().unwrap().push("fast") }
            }));

        assert!(queue.enqueue(slow));
        assert!(queue.enqueue(fast));
        assert!(queue.is_processing());
        queue.wait_for_completion().await;

        assert_eq!(*log.lock().unwrap(), vec!["slow:start", "slow:end", "fast"]);
        assert_eq!(state.move_count(), 2);
        assert!(!queue.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_invalidated_while_queued_is_skipped() {
        let queue = CommandQueue::new().unwrap();
        let (state, _) = manager();
        let events = Arc::new(EventBus::new());
        state.initialize_level(&row_level(&["a", "", ""]));

        // Both target (0,1); once the first runs, the second's source is gone
        let first = MoveCommand::new(state.clone(), events.clone(), GridPosition::new(0, 0), Direction::Right)
            .on_block_moved(block_moved(|_, _| tokio::time::sleep(Duration::from_millis(10))));
        let second = MoveCommand::new(state.clone(), events, GridPosition::new(0, 0), Direction::Right);

        assert!(queue.enqueue(first));
        assert!(queue.enqueue(second));
        queue.wait_for_completion().await;

        assert_eq!(state.move_count(), 1);
        assert!(state.grid_snapshot().unwrap().get(GridPosition::new(0, 1)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_keeps_running_command() {
        let queue = CommandQueue::new().unwrap();
        let (state, _) = manager();
        let events = Arc::new(EventBus::new());
        let ran = Arc::new(Mutex::new(Vec::new()));
        let started = Arc::new(Notify::new());

        let first_log = Arc::clone(&ran);
        let first_started = Arc::clone(&started);
        let first = SwitchLevelCommand::new(state.clone(), events.clone(), Some(row_level(&["a"])))
            .on_level_switched(hook(move || {
                first_log.lock().unwrap().push("first");
                first_started.notify_one();
            }));
        let second_log = Arc::clone(&ran);
        let second = SwitchLevelCommand::new(state.clone(), events.clone(), Some(row_level(&["b"])))
            .on_level_switched(hook(move || second_log.lock().unwrap().push("second")));

        assert!(queue.enqueue(first));
        started.notified().await;
        assert!(queue.enqueue(second));
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert!(queue.is_empty());
        queue.wait_for_completion().await;

        assert_eq!(*ran.lock().unwrap(), vec!["first"]);

        // The queue still works after a clear
        let third_log = Arc::clone(&ran);
        let third = SwitchLevelCommand::new(state, events, Some(row_level(&["c"])))
            .on_level_switched(hook(move || third_log.lock().unwrap().push("third")));
        assert!(queue.enqueue(third));
        queue.wait_for_completion().await;
        assert_eq!(*ran.lock().unwrap(), vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_clear_when_idle_leaves_waiters_resolved() {
        let queue = CommandQueue::new().unwrap();
        queue.clear();
        let mut wait = task::spawn(queue.wait_for_completion());
        assert_ready!(wait.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_pending_while_busy() {
        let queue = CommandQueue::new().unwrap();
        let (state, _) = manager();
        let events = Arc::new(EventBus::new());
        state.initialize_level(&row_level(&["a", ""]));

        let cmd = MoveCommand::new(state, events, GridPosition::new(0, 0), Direction::Right)
            .on_normalization_needed(async_hook(|| tokio::time::sleep(Duration::from_millis(100))));
        assert!(queue.enqueue(cmd));

        let mut wait = task::spawn(queue.wait_for_completion());
        assert_pending!(wait.poll());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(wait.is_woken());
        assert_ready!(wait.poll());
    }
}
