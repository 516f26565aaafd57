//! Match puzzle (workspace facade crate).
//!
//! This package exposes `match_puzzle::{core,engine,adapter,types}` as one
//! public API while the implementation lives in dedicated crates under
//! `crates/`.

pub use match_puzzle_adapter as adapter;
pub use match_puzzle_core as core;
pub use match_puzzle_engine as engine;
pub use match_puzzle_types as types;
