//! Error types for the command pipeline and its collaborators

use thiserror::Error;

/// Failure inside a persistence collaborator
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode game state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to decode game state: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("background persistence task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Fatal construction or collaborator errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The command queue spawns its consumer on the current tokio runtime
    #[error("command queue must be created inside a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
