use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StorageError;

/// A string key/value storage area with Web Storage semantics.
///
/// Reading an absent key is `Ok(None)` and removing an absent key is a no-op.
pub trait StorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Volatile in-process storage area.
///
/// Clones share the same underlying map, so a second store built on a clone
/// sees what the first one wrote (a "reload" within the same tab-group).
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of keys plus values, in bytes.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Raw access for inspection; values are whatever was written (ciphertext
    /// when used under an encrypted store).
    pub fn raw(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    // A panic while holding the lock cannot leave the map half-written.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.write();

        if let Some(quota) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.write().remove(key);
        Ok(())
    }
}

/// Directory-backed storage area, one file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Hex keeps distinct keys in distinct files, even on case-insensitive
    // filesystems.
    fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.item", hex::encode(key)))
    }
}

impl StorageArea for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.item_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.item_path(key), value)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_absent_key_is_none() {
        let storage = MemoryStorage::new();
        assert!(storage.get_item("missing").unwrap().is_none());
        storage.remove_item("missing").unwrap();
    }

    #[test]
    fn test_memory_storage_clones_share_items() {
        let storage = MemoryStorage::new();
        let reloaded = storage.clone();
        storage.set_item("k", "v").unwrap();
        assert_eq!(reloaded.get_item("k").unwrap().as_deref(), Some("v"));

        reloaded.remove_item("k").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_quota_exceeded() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("ab", "cdef").unwrap();

        let err = storage.set_item("xy", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 10, .. }));
        assert!(storage.get_item("xy").unwrap().is_none());

        // Overwriting an existing key only counts the new value
        storage.set_item("ab", "cdefghij").unwrap();
        assert_eq!(storage.raw("ab").as_deref(), Some("cdefghij"));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("tab")).unwrap();

        assert!(storage.get_item("user").unwrap().is_none());
        storage.set_item("user", "ciphertext").unwrap();
        assert_eq!(storage.get_item("user").unwrap().as_deref(), Some("ciphertext"));

        storage.remove_item("user").unwrap();
        storage.remove_item("user").unwrap();
        assert!(storage.get_item("user").unwrap().is_none());
    }

    #[test]
    fn test_file_storage_key_names_stay_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("tab")).unwrap();
        storage.set_item("../escape", "v").unwrap();

        assert!(storage.dir().join("2e2e2f657363617065.item").exists());
        assert!(!dir.path().join("escape.item").exists());
        assert_eq!(storage.get_item("../escape").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage_similar_keys_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.set_item("a.b", "dot").unwrap();
        storage.set_item("a_b", "underscore").unwrap();
        storage.set_item("A_B", "upper").unwrap();

        assert_eq!(storage.get_item("a.b").unwrap().as_deref(), Some("dot"));
        assert_eq!(storage.get_item("a_b").unwrap().as_deref(), Some("underscore"));
        assert_eq!(storage.get_item("A_B").unwrap().as_deref(), Some("upper"));

        storage.remove_item("a.b").unwrap();
        assert_eq!(storage.get_item("a_b").unwrap().as_deref(), Some("underscore"));
    }
}
