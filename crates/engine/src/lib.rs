//! Command pipeline - serialized state transitions over the simulation core
//!
//! This crate turns player intents into grid mutations, one at a time:
//!
//! ```text
//! caller ──enqueue──▶ CommandQueue ──execute──▶ Command
//!                                                 │
//!                      GameStateManager ◀─mutate──┤
//!                      animation hooks  ◀─await───┤
//!                      EventBus         ◀─publish─┘
//! ```
//!
//! # Module Structure
//!
//! - [`commands`]: move, swipe, switch level, restart level, normalize grid
//! - [`queue`]: single-consumer FIFO with completion signaling
//! - [`state`]: authoritative session state and its persistence
//! - [`event_bus`]: typed publish/subscribe for domain events
//! - [`callbacks`]: presentation hooks commands await
//! - [`persistence`]: storage collaborator boundary
//! - [`settings`]: match length and pacing
//!
//! # Concurrency
//!
//! The queue guarantees at most one command mutates the grid at a time. The
//! only concurrency inside a command is fan-out: N animation callbacks are
//! started together and all are awaited before the command continues. The
//! session lock is only held between await points.

pub mod callbacks;
pub mod commands;
pub mod error;
pub mod event_bus;
pub mod persistence;
pub mod queue;
pub mod settings;
pub mod state;

pub use match_puzzle_core as core;
pub use match_puzzle_types as types;

pub use callbacks::{
    AsyncHookFn, BlockDestroyFn, BlockFallFn, BlockMovedFn, HookFn,
};
pub use commands::{
    Command, MoveCommand, NormalizeGridCommand, Rejection, RestartLevelCommand, SwipeCommand,
    SwitchLevelCommand,
};
pub use error::{EngineError, PersistenceError};
pub use event_bus::{EventBus, SubscriptionId};
pub use persistence::{BoxFuture, Persistence};
pub use queue::CommandQueue;
pub use settings::MatchSettings;
pub use state::{GameStateManager, SessionState};
