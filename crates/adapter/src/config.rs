//! Service configuration

use std::env;
use std::path::PathBuf;

use crate::types::DEFAULT_LEVEL_CACHE_SIZE;

/// Where levels and saves live, and how the service manages them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Directory holding `level_NNNN.json` files
    pub levels_dir: PathBuf,
    /// Save file for the session profile
    pub save_path: PathBuf,
    /// Parsed levels kept in memory, at least 1
    pub level_cache_size: usize,
    /// Save in the background after every settled move
    pub autosave: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            levels_dir: PathBuf::from("levels"),
            save_path: PathBuf::from("match_puzzle_save.json"),
            level_cache_size: DEFAULT_LEVEL_CACHE_SIZE,
            autosave: true,
        }
    }
}

impl ServiceConfig {
    /// Create from environment variables
    ///
    /// - `MATCH_PUZZLE_LEVELS_DIR`
    /// - `MATCH_PUZZLE_SAVE_PATH`
    /// - `MATCH_PUZZLE_LEVEL_CACHE`
    /// - `MATCH_PUZZLE_AUTOSAVE` ("0"/"false"/"no"/"off" disable it)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let levels_dir = non_empty_var("MATCH_PUZZLE_LEVELS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.levels_dir);

        let save_path = non_empty_var("MATCH_PUZZLE_SAVE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.save_path);

        let level_cache_size = env::var("MATCH_PUZZLE_LEVEL_CACHE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.level_cache_size)
            .max(1);

        let autosave = non_empty_var("MATCH_PUZZLE_AUTOSAVE")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.autosave);

        Self {
            levels_dir,
            save_path,
            level_cache_size,
            autosave,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
