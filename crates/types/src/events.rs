//! Domain events published by the command pipeline.
//!
//! Events are plain data. Each event has its own struct so subscribers can
//! register for exactly the kind they care about; `GameEvent` is the closed
//! union used when a subscriber wants every event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Direction, GridPosition};

/// A level was (re)initialized and is ready for input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStarted {
    pub level_number: u32,
}

/// The grid of the current level was cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCompleted {
    pub level_number: u32,
    pub move_count: u32,
}

/// A move or swipe was applied. `position` is the source cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveExecuted {
    pub position: GridPosition,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksMatched {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocksDestroyed {
    pub count: usize,
}

/// A player gesture that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidMoveAttempt {
    pub position: GridPosition,
    pub direction: Direction,
    pub reason: String,
}

/// Discriminant of [`GameEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LevelStarted,
    LevelCompleted,
    MoveExecuted,
    BlocksMatched,
    BlocksDestroyed,
    InvalidMoveAttempt,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LevelStarted => "level_started",
            EventKind::LevelCompleted => "level_completed",
            EventKind::MoveExecuted => "move_executed",
            EventKind::BlocksMatched => "blocks_matched",
            EventKind::BlocksDestroyed => "blocks_destroyed",
            EventKind::InvalidMoveAttempt => "invalid_move_attempt",
        }
    }
}

/// Every event the simulation can publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    LevelStarted(LevelStarted),
    LevelCompleted(LevelCompleted),
    MoveExecuted(MoveExecuted),
    BlocksMatched(BlocksMatched),
    BlocksDestroyed(BlocksDestroyed),
    InvalidMoveAttempt(InvalidMoveAttempt),
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::LevelStarted(_) => EventKind::LevelStarted,
            GameEvent::LevelCompleted(_) => EventKind::LevelCompleted,
            GameEvent::MoveExecuted(_) => EventKind::MoveExecuted,
            GameEvent::BlocksMatched(_) => EventKind::BlocksMatched,
            GameEvent::BlocksDestroyed(_) => EventKind::BlocksDestroyed,
            GameEvent::InvalidMoveAttempt(_) => EventKind::InvalidMoveAttempt,
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::LevelStarted(e) => write!(f, "level {} started", e.level_number),
            GameEvent::LevelCompleted(e) => write!(
                f,
                "level {} completed in {} moves",
                e.level_number, e.move_count
            ),
            GameEvent::MoveExecuted(e) => write!(f, "moved {} {}", e.position, e.direction),
            GameEvent::BlocksMatched(e) => write!(f, "{} blocks matched", e.count),
            GameEvent::BlocksDestroyed(e) => write!(f, "{} blocks destroyed", e.count),
            GameEvent::InvalidMoveAttempt(e) => write!(
                f,
                "invalid move {} {}: {}",
                e.position, e.direction, e.reason
            ),
        }
    }
}

/// Implemented by every concrete event struct.
///
/// Ties each struct to its [`EventKind`] so the event bus can dispatch by a
/// static tag instead of runtime type lookup.
pub trait DomainEvent: Clone + Into<GameEvent> + Send + Sync + 'static {
    const KIND: EventKind;

    /// Borrow the concrete event out of the union if the variant matches.
    fn from_event(event: &GameEvent) -> Option<&Self>;
}

macro_rules! domain_event {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<$name> for GameEvent {
                fn from(event: $name) -> Self {
                    GameEvent::$name(event)
                }
            }

            impl DomainEvent for $name {
                const KIND: EventKind = EventKind::$name;

                fn from_event(event: &GameEvent) -> Option<&Self> {
                    match event {
                        GameEvent::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

domain_event!(
    LevelStarted,
    LevelCompleted,
    MoveExecuted,
    BlocksMatched,
    BlocksDestroyed,
    InvalidMoveAttempt,
);
