//! Error types for collaborators and the service facade

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::{EngineError, PersistenceError};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {0} not found")]
    NotFound(u32),

    #[error("no levels configured")]
    NoLevelsConfigured,

    #[error("level {level} is invalid: {reason}")]
    Invalid { level: u32, reason: &'static str },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
