//! Two-tier cache for master game reference data
//!
//! - L1: in-memory LRU, shared by every repository call in the process
//! - L2: optional JSON snapshots on disk, one file per key
//!
//! Master games are read far more often than they change, so every write path
//! in storage invalidates the affected keys instead of updating them in place.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    hash::Hash,
    io::{Read, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::cli::types::ids::MasterGameId;
use crate::cli::types::time::Year;
use crate::domain::{MasterGame, MasterGameYear};

/// Default cache directory: ~/.cache/fantasy-critic
pub fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| {
        let mut home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.push(".cache");
        home
    });
    base.join("fantasy-critic")
}

/// Try to read a file into a String
pub fn try_read_to_string(path: &Path) -> Option<String> {
    let mut f = fs::File::open(path).ok()?;
    let mut s = String::new();

    f.read_to_string(&mut s).ok()?;

    Some(s)
}

/// Write a string to file
pub fn write_string(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut f = fs::File::create(path)?;
    f.write_all(contents.as_bytes())
}

/// Generic cache key that can be used for both memory and disk caching
pub trait CacheKey: Hash + Eq + Clone + Send + Sync {
    /// Generate a string representation for file system storage
    fn to_file_key(&self) -> String;

    fn to_file_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.to_file_key()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MasterGameCacheKey(pub MasterGameId);

impl CacheKey for MasterGameCacheKey {
    fn to_file_key(&self) -> String {
        format!("master_game_{}", self.0)
    }
}

/// All master game years of one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MasterGameYearsCacheKey {
    pub year: Year,
}

impl CacheKey for MasterGameYearsCacheKey {
    fn to_file_key(&self) -> String {
        format!("master_game_years_{}", self.year)
    }
}

/// Unified cache that combines LRU memory cache with file system persistence
pub struct UnifiedCache<K, V>
where
    K: CacheKey,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    memory_cache: Arc<Mutex<LruCache<K, V>>>,
    memory_capacity: usize,
    disk_dir: Option<PathBuf>,
}

impl<K, V> UnifiedCache<K, V>
where
    K: CacheKey,
    V: Clone + Serialize + for<'de> Deserialize<'de>,
{
    /// Memory-only cache.
    pub fn new(memory_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(memory_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memory_cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            memory_capacity: capacity.get(),
            disk_dir: None,
        }
    }

    /// Cache that also snapshots entries as JSON under `dir`.
    pub fn with_disk(memory_capacity: usize, dir: PathBuf) -> Self {
        Self {
            disk_dir: Some(dir),
            ..Self::new(memory_capacity)
        }
    }

    fn memory(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.memory_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get an item from cache (checks memory first, then disk)
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(value) = self.memory().get(key) {
            return Some(value.clone());
        }

        let value = self.get_from_disk(key)?;
        self.memory().put(key.clone(), value.clone());
        Some(value)
    }

    /// Put an item into cache (stores in both memory and disk)
    pub fn put(&self, key: K, value: V) {
        self.memory().put(key.clone(), value.clone());

        if let Err(e) = self.put_to_disk(&key, &value) {
            tracing::warn!(key = %key.to_file_key(), error = %e, "Failed to write cache snapshot");
        }
    }

    /// Drop a key from both tiers.
    pub fn invalidate(&self, key: &K) {
        self.memory().pop(key);
        if let Err(e) = self.invalidate_disk_cache(key) {
            tracing::warn!(key = %key.to_file_key(), error = %e, "Failed to remove cache snapshot");
        }
    }

    fn get_from_disk(&self, key: &K) -> Option<V> {
        let path = key.to_file_path(self.disk_dir.as_ref()?);
        let content = try_read_to_string(&path)?;
        serde_json::from_str(&content).ok()
    }

    fn put_to_disk(&self, key: &K, value: &V) -> std::io::Result<()> {
        let Some(dir) = &self.disk_dir else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_string(&key.to_file_path(dir), &content)
    }

    /// Clear disk cache for a specific key (used when underlying data changes)
    pub fn invalidate_disk_cache(&self, key: &K) -> std::io::Result<()> {
        let Some(dir) = &self.disk_dir else {
            return Ok(());
        };
        let path = key.to_file_path(dir);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Clear memory cache only (keeps disk cache)
    pub fn clear_memory(&self) {
        self.memory().clear();
    }

    /// Get memory cache statistics
    pub fn memory_stats(&self) -> (usize, usize) {
        (self.memory().len(), self.memory_capacity)
    }
}

/// Master game caches owned by one database handle.
pub struct MasterGameCache {
    pub games: UnifiedCache<MasterGameCacheKey, MasterGame>,
    pub years: UnifiedCache<MasterGameYearsCacheKey, Vec<MasterGameYear>>,
}

impl MasterGameCache {
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            games: UnifiedCache::new(capacity),
            years: UnifiedCache::new(16),
        }
    }

    /// Year lists are also snapshotted under `cache_dir`.
    pub fn with_disk(capacity: usize, cache_dir: PathBuf) -> Self {
        Self {
            games: UnifiedCache::new(capacity),
            years: UnifiedCache::with_disk(16, cache_dir),
        }
    }

    /// Forget one game and every year list that may contain it.
    pub fn invalidate_game(&self, id: MasterGameId, years: &[Year]) {
        self.games.invalidate(&MasterGameCacheKey(id));
        for year in years {
            self.invalidate_year(*year);
        }
    }

    pub fn invalidate_year(&self, year: Year) {
        self.years.invalidate(&MasterGameYearsCacheKey { year });
    }

    pub fn clear_all_memory(&self) {
        self.games.clear_memory();
        self.years.clear_memory();
    }

    pub fn memory_stats(&self) -> HashMap<String, (usize, usize)> {
        let mut stats = HashMap::new();
        stats.insert("master_games".to_string(), self.games.memory_stats());
        stats.insert("master_game_years".to_string(), self.years.memory_stats());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tempfile::tempdir;

    #[test]
    fn test_try_read_to_string_nonexistent_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nonexistent.txt");

        assert_eq!(try_read_to_string(&file_path), None);
    }

    #[test]
    fn test_write_string_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("subdir").join("output.txt");

        write_string(&file_path, "test content").unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "test content");
    }

    #[test]
    fn test_cache_key_generation() {
        let key = MasterGameYearsCacheKey {
            year: Year::new(2026),
        };
        assert_eq!(key.to_file_key(), "master_game_years_2026");
        let path = key.to_file_path(Path::new("/tmp/fc"));
        assert!(path.to_string_lossy().ends_with("master_game_years_2026.json"));
    }

    #[test]
    fn test_unified_cache_lru_eviction() {
        let cache: UnifiedCache<MasterGameCacheKey, MasterGame> = UnifiedCache::new(2);

        let games: Vec<MasterGame> = ["A", "B", "C"]
            .iter()
            .map(|name| fixtures::master_game(name, None))
            .collect();
        for game in &games {
            cache.put(MasterGameCacheKey(game.id), game.clone());
        }

        assert_eq!(cache.memory_stats(), (2, 2));
        assert!(cache.get(&MasterGameCacheKey(games[0].id)).is_none());
        assert_eq!(
            cache.get(&MasterGameCacheKey(games[2].id)).map(|g| g.name),
            Some("C".to_string())
        );
    }

    #[test]
    fn test_disk_snapshot_survives_memory_clear() {
        let dir = tempdir().unwrap();
        let cache = MasterGameCache::with_disk(10, dir.path().to_path_buf());
        let key = MasterGameYearsCacheKey {
            year: fixtures::YEAR,
        };
        cache.years.put(key, vec![fixtures::game_year("Snapshotted")]);
        assert!(key.to_file_path(dir.path()).exists());

        cache.clear_all_memory();
        let restored = cache.years.get(&key).unwrap();
        assert_eq!(restored[0].master_game.name, "Snapshotted");

        cache.invalidate_year(fixtures::YEAR);
        assert!(!key.to_file_path(dir.path()).exists());
        assert!(cache.years.get(&key).is_none());
    }

    #[test]
    fn test_invalidate_game() {
        let cache = MasterGameCache::in_memory(10);
        let game = fixtures::master_game("Edited", None);
        cache.games.put(MasterGameCacheKey(game.id), game.clone());
        cache.years.put(
            MasterGameYearsCacheKey {
                year: fixtures::YEAR,
            },
            vec![],
        );

        cache.invalidate_game(game.id, &[fixtures::YEAR]);
        let stats = cache.memory_stats();
        assert_eq!(stats["master_games"].0, 0);
        assert_eq!(stats["master_game_years"].0, 0);
    }
}
