//! Persistence implementations
//!
//! - [`JsonFilePersistence`]: one JSON document on disk, written atomically
//!   (temp file + rename), with encoding/decoding off the async executor
//! - [`MemoryPersistence`]: the same JSON document kept in memory

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::core::GameStateProfileData;
use crate::engine::{BoxFuture, Persistence, PersistenceError};

fn encode(profile: &GameStateProfileData) -> Result<Vec<u8>, PersistenceError> {
    serde_json::to_vec_pretty(profile).map_err(PersistenceError::Serialize)
}

/// Empty or whitespace-only documents decode to the default profile
fn decode(bytes: &[u8]) -> Result<GameStateProfileData, PersistenceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(GameStateProfileData::default());
    }
    serde_json::from_slice(bytes).map_err(PersistenceError::Deserialize)
}

/// Profile stored as a JSON file
///
/// Saves are serialized in call order, so a background save can never
/// overwrite a newer one.
#[derive(Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn save(&self, profile: GameStateProfileData) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let bytes = tokio::task::spawn_blocking(move || encode(&profile)).await??;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "game state saved");
        Ok(())
    }

    async fn load(&self) -> Result<GameStateProfileData, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no save file, using defaults");
                return Ok(GameStateProfileData::default());
            }
            Err(err) => return Err(err.into()),
        };
        let len = bytes.len();
        let profile = tokio::task::spawn_blocking(move || decode(&bytes)).await??;
        info!(
            path = %self.path.display(),
            bytes = len,
            level = profile.current_level_number,
            "game state loaded"
        );
        Ok(profile)
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Persistence for JsonFilePersistence {
    fn save_game_state(
        &self,
        profile: GameStateProfileData,
    ) -> BoxFuture<'_, Result<(), PersistenceError>> {
        Box::pin(self.save(profile))
    }

    fn load_game_state(&self) -> BoxFuture<'_, Result<GameStateProfileData, PersistenceError>> {
        Box::pin(self.load())
    }

    fn has_saved_state(&self) -> bool {
        self.path.is_file()
    }

    fn clear_saved_state(&self) -> BoxFuture<'_, Result<(), PersistenceError>> {
        Box::pin(self.clear())
    }
}

/// Profile kept in memory as its JSON encoding
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    document: Mutex<Option<Vec<u8>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored profile
    pub fn with_profile(profile: &GameStateProfileData) -> Result<Self, PersistenceError> {
        Ok(Self {
            document: Mutex::new(Some(encode(profile)?)),
        })
    }

    /// Raw stored document, for inspection
    pub fn document(&self) -> Option<String> {
        self.slot()
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Vec<u8>>> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Persistence for MemoryPersistence {
    fn save_game_state(
        &self,
        profile: GameStateProfileData,
    ) -> BoxFuture<'_, Result<(), PersistenceError>> {
        let result = encode(&profile).map(|bytes| {
            *self.slot() = Some(bytes);
        });
        Box::pin(async move { result })
    }

    fn load_game_state(&self) -> BoxFuture<'_, Result<GameStateProfileData, PersistenceError>> {
        let result = match self.slot().as_deref() {
            Some(bytes) => decode(bytes),
            None => Ok(GameStateProfileData::default()),
        };
        Box::pin(async move { result })
    }

    fn has_saved_state(&self) -> bool {
        self.slot().is_some()
    }

    fn clear_saved_state(&self) -> BoxFuture<'_, Result<(), PersistenceError>> {
        *self.slot() = None;
        Box::pin(async { Ok(()) })
    }
}
