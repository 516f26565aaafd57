//! Persistence collaborator boundary
//!
//! The engine never touches storage itself. It hands complete
//! [`GameStateProfileData`] snapshots to whatever implements [`Persistence`].

use std::future::Future;
use std::pin::Pin;

use crate::core::GameStateProfileData;
use crate::error::PersistenceError;

/// Owned, sendable future used at trait-object boundaries
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Persistence: Send + Sync {
    fn save_game_state(
        &self,
        profile: GameStateProfileData,
    ) -> BoxFuture<'_, Result<(), PersistenceError>>;

    /// Returns the default profile (level 1, no level state) when nothing is
    /// stored
    fn load_game_state(&self) -> BoxFuture<'_, Result<GameStateProfileData, PersistenceError>>;

    fn has_saved_state(&self) -> bool;

    fn clear_saved_state(&self) -> BoxFuture<'_, Result<(), PersistenceError>>;
}
