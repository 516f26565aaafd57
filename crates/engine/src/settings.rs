//! Match tuning settings

use std::env;
use std::time::Duration;

use crate::types::{
    DEFAULT_MIN_MATCH_LENGTH, DEFAULT_NEXT_LEVEL_DELAY_MS, DEFAULT_POST_MATCH_DELAY_MS,
    MIN_MATCH_LENGTH_FLOOR,
};

/// Rules and pacing for normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    /// Shortest run that matches, never below 2
    pub min_match_length: usize,
    /// Pause after destroying matches, before the next gravity pass
    pub post_match_delay_ms: u64,
    /// Pause between clearing a level and loading the next
    pub next_level_delay_ms: u64,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_match_length: DEFAULT_MIN_MATCH_LENGTH,
            post_match_delay_ms: DEFAULT_POST_MATCH_DELAY_MS,
            next_level_delay_ms: DEFAULT_NEXT_LEVEL_DELAY_MS,
        }
    }
}

impl MatchSettings {
    /// Create from environment variables
    ///
    /// - `MATCH_PUZZLE_MIN_MATCH`
    /// - `MATCH_PUZZLE_POST_MATCH_DELAY_MS`
    /// - `MATCH_PUZZLE_NEXT_LEVEL_DELAY_MS`
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let min_match_length = env::var("MATCH_PUZZLE_MIN_MATCH")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.min_match_length);

        let post_match_delay_ms = env::var("MATCH_PUZZLE_POST_MATCH_DELAY_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.post_match_delay_ms);

        let next_level_delay_ms = env::var("MATCH_PUZZLE_NEXT_LEVEL_DELAY_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.next_level_delay_ms);

        Self {
            min_match_length,
            post_match_delay_ms,
            next_level_delay_ms,
        }
        .clamped()
    }

    /// Raise the match length to its floor
    pub fn clamped(self) -> Self {
        Self {
            min_match_length: self.min_match_length.max(MIN_MATCH_LENGTH_FLOOR),
            ..self
        }
    }

    /// Settings with no pauses, for tests and tools
    pub fn instant() -> Self {
        Self {
            post_match_delay_ms: 0,
            next_level_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn effective_min_match_length(&self) -> usize {
        self.min_match_length.max(MIN_MATCH_LENGTH_FLOOR)
    }

    pub fn post_match_delay(&self) -> Duration {
        Duration::from_millis(self.post_match_delay_ms)
    }

    pub fn next_level_delay(&self) -> Duration {
        Duration::from_millis(self.next_level_delay_ms)
    }
}
