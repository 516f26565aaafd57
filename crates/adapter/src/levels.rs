//! Level sources
//!
//! Levels are numbered from 1. [`JsonLevelRepository`] reads one
//! `level_NNNN.json` document per level and keeps the most recently used
//! ones parsed in memory.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::core::Level;
use crate::engine::BoxFuture;
use crate::error::LevelError;

/// Where level definitions come from
pub trait LevelSource: Send + Sync {
    /// Number of levels available
    fn level_count(&self) -> usize;

    fn load_level(&self, level_number: u32) -> BoxFuture<'_, Result<Level, LevelError>>;

    /// Drop any cached definitions
    fn clear_cache(&self) {}
}

/// File name of a level document
pub fn level_file_name(level_number: u32) -> String {
    format!("level_{:04}.json", level_number)
}

fn is_level_file(name: &str) -> bool {
    name.strip_prefix("level_")
        .and_then(|rest| rest.strip_suffix(".json"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Least-recently-used cache of parsed levels
#[derive(Debug)]
struct LevelCache {
    capacity: usize,
    levels: HashMap<u32, Level>,
    /// Front is least recently used
    order: VecDeque<u32>,
}

impl LevelCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            levels: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn touch(&mut self, level_number: u32) {
        self.order.retain(|&n| n != level_number);
        self.order.push_back(level_number);
    }

    fn get(&mut self, level_number: u32) -> Option<Level> {
        let level = self.levels.get(&level_number).cloned()?;
        self.touch(level_number);
        Some(level)
    }

    fn insert(&mut self, level: Level) {
        let level_number = level.level_number;
        self.levels.insert(level_number, level);
        self.touch(level_number);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.levels.remove(&evicted);
                debug!(level = evicted, "evicted from level cache");
            }
        }
    }

    fn clear(&mut self) {
        self.levels.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.levels.len()
    }
}

/// Levels read from a directory of JSON documents
#[derive(Debug)]
pub struct JsonLevelRepository {
    dir: PathBuf,
    count: usize,
    cache: Mutex<LevelCache>,
}

impl JsonLevelRepository {
    /// Scan `dir` for level documents. A missing directory yields no levels.
    pub async fn open(dir: impl Into<PathBuf>, cache_size: usize) -> Result<Self, LevelError> {
        let dir = dir.into();
        let count = count_level_files(&dir).await?;
        info!(dir = %dir.display(), count, "level repository opened");
        Ok(Self {
            dir,
            count,
            cache: Mutex::new(LevelCache::new(cache_size)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn level_path(&self, level_number: u32) -> PathBuf {
        self.dir.join(level_file_name(level_number))
    }

    /// Levels currently held parsed
    pub fn cached_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, LevelCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn read(&self, level_number: u32) -> Result<Level, LevelError> {
        if let Some(level) = self.cache().get(level_number) {
            return Ok(level);
        }

        let path = self.level_path(level_number);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LevelError::NotFound(level_number));
            }
            Err(source) => return Err(LevelError::Io { path, source }),
        };
        let mut level: Level = serde_json::from_slice(&bytes)
            .map_err(|source| LevelError::Parse { path: path.clone(), source })?;
        // The file name is authoritative
        level.level_number = level_number;
        level.validate().map_err(|reason| LevelError::Invalid {
            level: level_number,
            reason,
        })?;

        debug!(level = level_number, path = %path.display(), "level parsed");
        self.cache().insert(level.clone());
        Ok(level)
    }
}

async fn count_level_files(dir: &Path) -> Result<usize, LevelError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(LevelError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut count = 0;
    loop {
        let entry = entries.next_entry().await.map_err(|source| LevelError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else { break };
        if entry.file_name().to_str().is_some_and(is_level_file) {
            count += 1;
        }
    }
    Ok(count)
}

impl LevelSource for JsonLevelRepository {
    fn level_count(&self) -> usize {
        self.count
    }

    fn load_level(&self, level_number: u32) -> BoxFuture<'_, Result<Level, LevelError>> {
        Box::pin(self.read(level_number))
    }

    fn clear_cache(&self) {
        self.cache().clear();
    }
}

/// Fixed set of levels held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLevels {
    levels: Vec<Level>,
}

impl InMemoryLevels {
    pub fn new(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    pub fn push(&mut self, level: Level) {
        self.levels.push(level);
    }
}

impl LevelSource for InMemoryLevels {
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn load_level(&self, level_number: u32) -> BoxFuture<'_, Result<Level, LevelError>> {
        let result = self
            .levels
            .iter()
            .find(|level| level.level_number == level_number)
            .cloned()
            .ok_or(LevelError::NotFound(level_number))
            .and_then(|level| {
                level.validate().map_err(|reason| LevelError::Invalid {
                    level: level_number,
                    reason,
                })?;
                Ok(level)
            });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("match-puzzle-levels-{}-{}", std::process::id(), name))
    }

    async fn write_level(dir: &Path, level: &Level) {
        tokio::fs::create_dir_all(dir).await.unwrap();
        let json = serde_json::to_vec(level).unwrap();
        tokio::fs::write(dir.join(level_file_name(level.level_number)), json)
            .await
            .unwrap();
    }

    #[test]
    fn test_level_file_name() {
        assert_eq!(level_file_name(1), "level_0001.json");
        assert_eq!(level_file_name(42), "level_0042.json");
        assert!(is_level_file("level_0007.json"));
        assert!(!is_level_file("level_.json"));
        assert!(!is_level_file("level_0007.txt"));
        assert!(!is_level_file("notes.json"));
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = LevelCache::new(2);
        cache.insert(Level::new(1, 1, 1));
        cache.insert(Level::new(2, 1, 1));
        assert!(cache.get(1).is_some());
        cache.insert(Level::new(3, 1, 1));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
    }

    #[tokio::test]
    async fn test_repository_reads_and_caches() {
        let dir = temp_dir("read");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        write_level(&dir, &Level::new(1, 2, 2).with_block("fire", 0, 0)).await;
        write_level(&dir, &Level::new(2, 3, 3)).await;
        tokio::fs::write(dir.join("readme.txt"), b"ignored").await.unwrap();

        let repo = JsonLevelRepository::open(&dir, 3).await.unwrap();
        assert_eq!(repo.level_count(), 2);

        let level = repo.load_level(1).await.unwrap();
        assert_eq!(level.rows, 2);
        assert_eq!(level.blocks.len(), 1);
        assert_eq!(repo.cached_len(), 1);

        // Served from cache even once the file is gone
        tokio::fs::remove_file(repo.level_path(1)).await.unwrap();
        assert_eq!(repo.load_level(1).await.unwrap(), level);

        repo.clear_cache();
        assert_eq!(repo.cached_len(), 0);
        assert!(matches!(repo.load_level(1).await, Err(LevelError::NotFound(1))));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_repository_parse_error() {
        let dir = temp_dir("parse");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(level_file_name(1)), b"{ \"rows\": ").await.unwrap();

        let repo = JsonLevelRepository::open(&dir, 3).await.unwrap();
        assert!(matches!(repo.load_level(1).await, Err(LevelError::Parse { .. })));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_repository_rejects_oversized_level() {
        let dir = temp_dir("oversized");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(
            dir.join(level_file_name(1)),
            br#"{ "levelNumber": 1, "rows": 18446744073709551615, "columns": 2, "blocks": [] }"#,
        )
        .await
        .unwrap();

        let repo = JsonLevelRepository::open(&dir, 3).await.unwrap();
        let err = repo.load_level(1).await.unwrap_err();
        assert!(matches!(err, LevelError::Invalid { level: 1, reason: "grid dimensions overflow" }));
        assert_eq!(repo.cached_len(), 0);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_missing_directory_has_no_levels() {
        let repo = JsonLevelRepository::open(temp_dir("missing"), 3).await.unwrap();
        assert_eq!(repo.level_count(), 0);
    }

    #[tokio::test]
    async fn test_in_memory_levels() {
        let levels = InMemoryLevels::new(vec![Level::new(1, 1, 1), Level::new(2, 2, 2)]);
        assert_eq!(levels.level_count(), 2);
        assert_eq!(levels.load_level(2).await.unwrap().rows, 2);
        assert!(matches!(levels.load_level(5).await, Err(LevelError::NotFound(5))));

        let empty = InMemoryLevels::new(vec![Level::new(1, 0, 0)]);
        assert!(matches!(empty.load_level(1).await, Err(LevelError::Invalid { level: 1, .. })));
    }
}
