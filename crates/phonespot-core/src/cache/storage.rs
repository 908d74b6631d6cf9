//! String key/value backends underneath the cache store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::CacheError;

/// Synchronous string key/value persistence.
///
/// Implementations must be cheap and non-blocking enough to call from
/// async code without `spawn_blocking`.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove_item(&self, key: &str) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

/// Ephemeral in-process storage, empty at start.
///
/// An optional byte quota (keys + values) makes writes fail the way a
/// full browser store does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items();
        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(CacheError::QuotaExceeded { needed, available });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        self.items().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.items().clear();
        Ok(())
    }
}

/// One JSON file per key inside a cache directory.
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    // Keys become file names, so anything outside [A-Za-z0-9_-] is replaced.
    fn cache_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", name))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        std::fs::write(self.cache_path(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let path = self.cache_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                debug!(?path, "Removing cache file");
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip_and_clear() {
        let storage = MemoryStorage::new();
        assert!(storage.get_item("a").unwrap().is_none());

        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.len(), 2);

        storage.remove_item("a").unwrap();
        assert!(storage.get_item("a").unwrap().is_none());

        storage.clear().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "12345").unwrap();

        let err = storage.set_item("other", "123456789").unwrap_err();
        assert!(matches!(err, CacheError::QuotaExceeded { .. }));
        assert!(err.is_storage());

        // Overwriting an existing key does not count its old value
        storage.set_item("k", "123456789").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("123456789"));
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("cache")).unwrap();

        assert!(storage.get_item("cachedCategories").unwrap().is_none());
        storage.set_item("cachedCategories", "[1,2]").unwrap();
        assert_eq!(
            storage.get_item("cachedCategories").unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(storage.cache_dir().join("cachedCategories.json").exists());

        storage.remove_item("cachedCategories").unwrap();
        assert!(storage.get_item("cachedCategories").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.set_item("../escape/attempt", "x").unwrap();
        assert!(dir.path().join("___escape_attempt.json").exists());
        assert_eq!(storage.get_item("../escape/attempt").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_storage_clear_only_removes_json() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        storage.clear().unwrap();
        assert!(storage.get_item("a").unwrap().is_none());
        assert!(storage.get_item("b").unwrap().is_none());
        assert!(dir.path().join("notes.txt").exists());
    }
}
