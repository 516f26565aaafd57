//! Adapter module - file-backed collaborators and the session facade
//!
//! This crate connects the command pipeline to the outside world: level
//! definitions and save files on disk, and a single service object a
//! presentation layer (or the headless runner) drives.
//!
//! # Module Structure
//!
//! - [`service`]: [`MatchPuzzleService`], gesture validation, level flow
//! - [`levels`]: [`LevelSource`] and its JSON directory / in-memory forms
//! - [`persistence`]: JSON file and in-memory save storage
//! - [`config`]: paths and flags from the environment
//! - [`error`]: level and service errors
//!
//! # Level Files
//!
//! One document per level, named `level_NNNN.json` (1-based, zero padded):
//!
//! ```text
//! {
//!   "levelNumber": 1,
//!   "rows": 6,
//!   "columns": 5,
//!   "blocks": [ { "type": "fire", "row": 0, "column": 2 }, ... ]
//! }
//! ```
//!
//! Row 0 is the bottom row. The number of such files is the level count;
//! requested level numbers wrap around it.
//!
//! # Environment Variables
//!
//! - `MATCH_PUZZLE_LEVELS_DIR`: level directory (default: "levels")
//! - `MATCH_PUZZLE_SAVE_PATH`: save file (default: "match_puzzle_save.json")
//! - `MATCH_PUZZLE_LEVEL_CACHE`: parsed levels kept in memory (default: 3)
//! - `MATCH_PUZZLE_AUTOSAVE`: set to "0" or "false" to only save on level load

pub mod config;
pub mod error;
pub mod levels;
pub mod persistence;
pub mod service;

pub use match_puzzle_core as core;
pub use match_puzzle_engine as engine;
pub use match_puzzle_types as types;

pub use config::ServiceConfig;
pub use error::{LevelError, ServiceError};
pub use levels::{InMemoryLevels, JsonLevelRepository, LevelSource};
pub use persistence::{JsonFilePersistence, MemoryPersistence};
pub use service::{Headless, MatchPuzzleService, PresentationHooks, ServiceBuilder};
