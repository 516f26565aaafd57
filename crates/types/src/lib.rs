//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental value types used throughout the match
//! puzzle. All types are plain data with no behaviour beyond construction,
//! comparison and formatting, making them usable in any context (simulation
//! core, command pipeline, persistence, presentation).
//!
//! # Coordinates
//!
//! Grid coordinates are `(row, column)`:
//!
//! - **Row 0** is the bottom row, rows grow upwards
//! - **Column 0** is the leftmost column, columns grow to the right
//! - Positions are signed so that `Down` from row 0 is representable (and
//!   simply out of bounds)
//!
//! # Tuning Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `DEFAULT_MIN_MATCH_LENGTH` | 3 | Shortest run that counts as a match |
//! | `MIN_MATCH_LENGTH_FLOOR` | 2 | Match lengths below this are raised to it |
//! | `DEFAULT_POST_MATCH_DELAY_MS` | 100 | Pause after destroying matches |
//! | `DEFAULT_NEXT_LEVEL_DELAY_MS` | 500 | Pause before auto-loading the next level |
//! | `DEFAULT_LEVEL_CACHE_SIZE` | 3 | Level definitions kept in memory |
//!
//! # Examples
//!
//! ```
//! use match_puzzle_types::{BlockTypeId, Direction, GridPosition};
//!
//! let pos = GridPosition::new(0, 1);
//! assert_eq!(pos.up(), GridPosition::new(1, 1));
//! assert_eq!(pos.offset(Direction::Left), GridPosition::new(0, 0));
//!
//! // Block types compare case-insensitively, ignoring surrounding whitespace
//! assert_eq!(BlockTypeId::new(" Fire "), BlockTypeId::new("fire"));
//! assert!(BlockTypeId::new("   ").is_none());
//!
//! assert_eq!(Direction::from_str("UP"), Some(Direction::Up));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod events;

pub use events::{
    BlocksDestroyed, BlocksMatched, DomainEvent, EventKind, GameEvent, InvalidMoveAttempt,
    LevelCompleted, LevelStarted, MoveExecuted,
};

/// Shortest horizontal/vertical run that counts as a match.
pub const DEFAULT_MIN_MATCH_LENGTH: usize = 3;

/// Lower bound applied to any configured match length.
pub const MIN_MATCH_LENGTH_FLOOR: usize = 2;

/// Delay after matched blocks are destroyed, before the next gravity pass.
pub const DEFAULT_POST_MATCH_DELAY_MS: u64 = 100;

/// Delay before the next level is loaded once a level is cleared.
pub const DEFAULT_NEXT_LEVEL_DELAY_MS: u64 = 500;

/// Number of parsed level definitions kept by the level repository.
pub const DEFAULT_LEVEL_CACHE_SIZE: usize = 3;

/// Level number a fresh session starts from.
pub const FIRST_LEVEL_NUMBER: u32 = 1;

/// Largest grid (rows x columns) a level or saved game may describe.
pub const MAX_GRID_CELLS: usize = 1 << 16;


/// Cell coordinate on the grid. Row 0 is the bottom, column 0 the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: i32,
    pub column: i32,
}

impl GridPosition {
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    // Offsets wrap at the i32 edges. A wrapped coordinate is never on a grid.

    /// Position one row above.
    pub const fn up(self) -> Self {
        Self::new(self.row.wrapping_add(1), self.column)
    }

    /// Position one row below.
    pub const fn down(self) -> Self {
        Self::new(self.row.wrapping_sub(1), self.column)
    }

    /// Position one column to the left.
    pub const fn left(self) -> Self {
        Self::new(self.row, self.column.wrapping_sub(1))
    }

    /// Position one column to the right.
    pub const fn right(self) -> Self {
        Self::new(self.row, self.column.wrapping_add(1))
    }

    /// Adjacent position in the given direction.
    pub const fn offset(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => self.up(),
            Direction::Down => self.down(),
            Direction::Left => self.left(),
            Direction::Right => self.right(),
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// The four directions a block can be moved or swiped in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Neighbor scan order used by the grid.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Parse direction from string
    ///
    /// Accepts full names or single letters (case-insensitive):
    /// "up" | "u", "down" | "d", "left" | "l", "right" | "r"
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "u" => Some(Direction::Up),
            "down" | "d" => Some(Direction::Down),
            "left" | "l" => Some(Direction::Left),
            "right" | "r" => Some(Direction::Right),
            _ => None,
        }
    }

    /// Convert to lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a block kind ("fire", "water", ...)
///
/// The stored value is trimmed and lowercased on construction, so equality
/// and hashing are case-insensitive and ignore surrounding whitespace.
/// An empty or whitespace-only input yields the distinguished "None" type.
/// Cloning is cheap (shared string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BlockTypeId(Option<Arc<str>>);

impl BlockTypeId {
    pub fn new(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(Arc::from(trimmed.to_lowercase())))
        }
    }

    /// The distinguished "no type" value.
    pub const fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Normalized value; empty for "None".
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl From<&str> for BlockTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BlockTypeId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<BlockTypeId> for String {
    fn from(value: BlockTypeId) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => f.write_str(value),
            None => f.write_str("None"),
        }
    }
}

/// Unique, never reused block identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
