use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{CacheEntry, CacheError, MemoryStorage, Storage};

/// Typed view over a string [`Storage`] backend.
///
/// Reads never fail: unreadable, unparseable or empty entries all come back
/// as `None`. Clone is cheap; clones share the backend.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Load the untyped entry, applying the malformed/empty-as-absent rules.
    fn load_raw(&self, key: &str) -> Option<CacheEntry<Value>> {
        let contents = match self.storage.get_item(key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache entry, treating as absent");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Malformed cache entry, treating as absent");
                return None;
            }
        };

        // Distinct keys can share a backend slot once sanitized
        if entry.key != key {
            debug!(
                key,
                stored_key = %entry.key,
                "Cache entry belongs to another key, treating as absent"
            );
            return None;
        }

        if is_empty_value(&entry.value) {
            debug!(key, "Empty cache entry, treating as absent");
            return None;
        }

        Some(entry)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.load_raw(key)?;
        let stored_at = entry.stored_at;
        match serde_json::from_value::<T>(entry.value) {
            Ok(value) => Some(CacheEntry {
                key: key.to_string(),
                value,
                stored_at,
            }),
            Err(e) => {
                debug!(key, error = %e, "Cache entry has unexpected shape, treating as absent");
                None
            }
        }
    }

    /// Overwrite the entry for `key`. Last writer wins.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value);
        let contents = serde_json::to_string(&entry).map_err(|source| CacheError::Encoding {
            key: key.to_string(),
            source,
        })?;
        self.storage.set_item(key, &contents)?;
        debug!(key, bytes = contents.len(), "Cache entry written");
        Ok(())
    }

    /// True iff `get::<T>` would return a value.
    pub fn has<T: DeserializeOwned>(&self, key: &str) -> bool {
        self.get::<T>(key).is_some()
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.storage.remove_item(key)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.storage.clear()
    }
}

/// `null`, `[]` and `{}` carry nothing worth rendering.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::ser::Error as _;
    use serde::Serializer;

    use super::*;
    use crate::cache::FileStorage;
    use crate::models::Category;

    fn category(name: &str) -> Category {
        Category {
            name: name.to_string(),
            slug: format!("/services/{}", name.to_lowercase()),
            image: "https://base.test/img.png".to_string(),
            short_description: "desc".to_string(),
        }
    }

    fn store_with(storage: Arc<MemoryStorage>) -> CacheStore {
        CacheStore::new(storage)
    }

    #[test]
    fn test_set_then_get() {
        let store = CacheStore::in_memory();
        let cats = vec![category("Screens"), category("Batteries")];
        store.set("cachedCategories", &cats).unwrap();

        let entry = store.get::<Vec<Category>>("cachedCategories").unwrap();
        assert_eq!(entry.key, "cachedCategories");
        assert_eq!(entry.value, cats);
        assert!(store.has::<Vec<Category>>("cachedCategories"));
    }

    #[test]
    fn test_missing_key() {
        let store = CacheStore::in_memory();
        assert!(store.get::<Vec<Category>>("nothing").is_none());
        assert!(!store.has::<Vec<Category>>("nothing"));
    }

    #[test]
    fn test_malformed_json_is_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("cachedCategories", "{not valid").unwrap();
        let store = store_with(storage);

        assert!(store.get::<Vec<Category>>("cachedCategories").is_none());
        assert!(!store.has::<Vec<Category>>("cachedCategories"));
    }

    #[test]
    fn test_bare_value_without_envelope_is_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("cachedCategories", r#"[{"name": "x"}]"#).unwrap();
        let store = store_with(storage);
        assert!(store.get::<Vec<Category>>("cachedCategories").is_none());
    }

    #[test]
    fn test_empty_list_is_absent() {
        let store = CacheStore::in_memory();
        store.set("cachedCategories", &Vec::<Category>::new()).unwrap();
        assert!(store.get::<Vec<Category>>("cachedCategories").is_none());
        assert!(!store.has::<Vec<Category>>("cachedCategories"));
    }

    #[test]
    fn test_wrong_shape_is_absent() {
        let store = CacheStore::in_memory();
        store.set("k", &vec!["just", "strings"]).unwrap();
        assert!(store.get::<Vec<Category>>("k").is_none());
        assert!(!store.has::<Vec<Category>>("k"));
        assert!(store.has::<Vec<String>>("k"));
    }

    #[test]
    fn test_colliding_file_names_do_not_leak_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        let store = CacheStore::new(storage);

        // Both keys sanitize to the same file name
        store.set("nav/categories", &vec![category("Nav")]).unwrap();
        assert!(store.get::<Vec<Category>>("nav_categories").is_none());
        assert!(!store.has::<Vec<Category>>("nav_categories"));
        assert_eq!(
            store.get::<Vec<Category>>("nav/categories").unwrap().value[0].name,
            "Nav"
        );
    }

    #[test]
    fn test_last_writer_wins() {
        let store = CacheStore::in_memory();
        store.set("k", &vec![category("First")]).unwrap();
        store.set("k", &vec![category("Second")]).unwrap();
        let entry = store.get::<Vec<Category>>("k").unwrap();
        assert_eq!(entry.value[0].name, "Second");
    }

    #[test]
    fn test_quota_exceeded_surfaces_storage_error() {
        let store = store_with(Arc::new(MemoryStorage::with_quota(16)));
        let err = store.set("k", &vec![category("Too big to fit")]).unwrap_err();
        assert!(matches!(err, CacheError::QuotaExceeded { .. }));
        assert!(store.get::<Vec<Category>>("k").is_none());
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot encode"))
        }
    }

    #[test]
    fn test_encoding_error() {
        let store = CacheStore::in_memory();
        let err = store.set("k", &Unencodable).unwrap_err();
        assert!(matches!(err, CacheError::Encoding { ref key, .. } if key == "k"));
        assert!(!err.is_storage());
    }

    #[test]
    fn test_non_string_map_keys_fail_to_encode() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let store = CacheStore::in_memory();
        assert!(matches!(store.set("k", &map), Err(CacheError::Encoding { .. })));
    }

    #[test]
    fn test_remove_and_clear() {
        let store = CacheStore::in_memory();
        store.set("a", &vec![1]).unwrap();
        store.set("b", &vec![2]).unwrap();

        store.remove("a").unwrap();
        assert!(!store.has::<Vec<i32>>("a"));
        assert!(store.has::<Vec<i32>>("b"));

        store.clear().unwrap();
        assert!(!store.has::<Vec<i32>>("b"));
    }

    #[test]
    fn test_clones_share_backend() {
        let store = CacheStore::in_memory();
        let other = store.clone();
        store.set("k", &vec![1]).unwrap();
        assert!(other.has::<Vec<i32>>("k"));
    }
}
