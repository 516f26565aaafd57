//! Core simulation module - pure, deterministic, and testable
//!
//! This module contains the grid model and the rules that settle it.
//! It has **zero dependencies** on async runtimes, I/O, or presentation,
//! making it:
//!
//! - **Deterministic**: the same grid always normalizes the same way
//! - **Testable**: every rule is a plain function over a [`Grid`]
//! - **Portable**: usable from the command pipeline, tools, or benchmarks
//!
//! # Module Structure
//!
//! - [`block`]: a puzzle piece and the per-session id allocator
//! - [`grid`]: fixed-size cell store with tolerant bounds handling
//! - [`match_finder`]: row/column run detection and flood-fill grouping
//! - [`normalization`]: gravity settling plus match detection per cycle
//! - [`level`]: level definitions and persisted session snapshots
//!
//! # Rules
//!
//! - **Gravity**: a block with an empty cell below it falls one cell per pass
//!   until nothing can fall
//! - **Matching**: a straight run of at least `min_match_length` same-type
//!   blocks (default 3) is matched; touching matched blocks of the same type
//!   form one area
//! - **Clearing**: matched areas are destroyed by the caller, then the grid
//!   is normalized again; a level is complete when the grid is empty
//!
//! # Example
//!
//! ```
//! use match_puzzle_core::{BlockIdAllocator, Level, NormalizationEngine};
//!
//! let ids = BlockIdAllocator::new();
//! let level = Level::new(1, 1, 3)
//!     .with_block("a", 0, 0)
//!     .with_block("a", 0, 1)
//!     .with_block("a", 0, 2);
//! let mut grid = level.build_grid(&ids);
//!
//! let engine = NormalizationEngine::new(3);
//! let result = engine.normalize(&mut grid);
//! assert!(result.moves.is_empty());
//! assert_eq!(result.matched_areas.len(), 1);
//!
//! engine.destroy_blocks(&mut grid, &result.matched_areas);
//! assert!(grid.is_grid_empty());
//! ```

pub mod block;
pub mod grid;
pub mod level;
pub mod match_finder;
pub mod normalization;

pub use match_puzzle_types as types;

// Re-export commonly used types for convenience
pub use block::{Block, BlockIdAllocator};
pub use grid::{checked_cell_count, Grid};
pub use level::{
    BlockData, BlockStateProfileData, GameStateProfileData, Level, LevelStateProfileData,
};
pub use match_finder::{MatchFinder, MatchedArea};
pub use normalization::{apply_gravity, BlockMove, NormalizationEngine, NormalizationResult};
