use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::storage::StorageArea;
use crate::crypto::StaticCipher;
use crate::error::StoreError;

pub struct EncryptedStore {
    area: Box<dyn StorageArea>,
    cipher: Option<StaticCipher>,
}

impl std::fmt::Debug for EncryptedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStore")
            .field("keyed", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

impl EncryptedStore {
    /// Build a store over `area`, deriving the cipher from `secret`.
    ///
    /// A missing or empty secret (or a failed derivation) yields a keyless
    /// store: writes are dropped and every read is `None`.
    pub fn new(area: impl StorageArea + 'static, secret: Option<&str>) -> Self {
        let cipher = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => match StaticCipher::from_secret(secret) {
                Ok(cipher) => Some(cipher),
                Err(e) => {
                    warn!(error = %e, "Failed to derive session store key");
                    None
                }
            },
            None => {
                warn!("No session secret configured, session persistence disabled");
                None
            }
        };
        Self::with_cipher(area, cipher)
    }

    pub fn with_cipher(area: impl StorageArea + 'static, cipher: Option<StaticCipher>) -> Self {
        Self {
            area: Box::new(area),
            cipher,
        }
    }

    /// Whether a secret is configured and values can round-trip.
    pub fn is_keyed(&self) -> bool {
        self.cipher.is_some()
    }

    /// Serialize, encrypt and write `value` under `key`.
    ///
    /// Storage failures (such as an exceeded quota) are returned. Without a
    /// secret this logs and writes nothing.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let Some(cipher) = &self.cipher else {
            warn!(key, "Session store has no secret, value not persisted");
            return Ok(());
        };

        let plaintext = serde_json::to_vec(value)?;
        let ciphertext = cipher.encrypt(&plaintext)?;
        self.area.set_item(key, &ciphertext)?;
        debug!(key, bytes = ciphertext.len(), "Stored encrypted value");
        Ok(())
    }

    /// Read `key`, keeping the difference between "absent" (`Ok(None)`) and
    /// "unreadable" (`Err`).
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(ciphertext) = self.area.get_item(key)? else {
            return Ok(None);
        };
        let cipher = self.cipher.as_ref().ok_or(StoreError::MissingSecret)?;

        let plaintext = cipher.decrypt(&ciphertext)?;
        let text = String::from_utf8(plaintext)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Read `key`; absent and unreadable values are both `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read encrypted value");
                None
            }
        }
    }

    /// Delete `key`. Never fails; an absent key is fine.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.area.remove_item(key) {
            warn!(key, error = %e, "Failed to remove stored value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CipherError, StorageError};
    use crate::store::MemoryStorage;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: i64,
        name: String,
    }

    fn keyed(area: &MemoryStorage) -> EncryptedStore {
        EncryptedStore::new(area.clone(), Some("test-secret"))
    }

    #[test]
    fn test_set_then_get() {
        let area = MemoryStorage::new();
        let store = keyed(&area);
        let profile = Profile { id: 7, name: "Ada".to_string() };

        store.set("profile", &profile).unwrap();
        assert_eq!(store.get::<Profile>("profile"), Some(profile));
    }

    #[test]
    fn test_stored_value_is_ciphertext() {
        let area = MemoryStorage::new();
        let store = keyed(&area);
        store.set("user", &json!({"full_name": "Ada Lovelace"})).unwrap();

        let raw = area.raw("user").unwrap();
        assert!(!raw.contains("Lovelace"));
    }

    #[test]
    fn test_absent_key_is_none_not_error() {
        let store = keyed(&MemoryStorage::new());
        assert!(store.try_get::<i64>("missing").unwrap().is_none());
        assert!(store.get::<i64>("missing").is_none());
    }

    #[test]
    fn test_corrupt_ciphertext_is_error_then_none() {
        let area = MemoryStorage::new();
        let store = keyed(&area);
        store.set("n", &5_i64).unwrap();

        area.set_item("n", "definitely not ciphertext").unwrap();
        assert!(matches!(
            store.try_get::<i64>("n"),
            Err(StoreError::Cipher(CipherError::Encoding(_)))
        ));
        assert!(store.get::<i64>("n").is_none());
    }

    #[test]
    fn test_wrong_shape_is_none() {
        let store = keyed(&MemoryStorage::new());
        store.set("n", "text").unwrap();
        assert!(matches!(store.try_get::<i64>("n"), Err(StoreError::Serialization(_))));
        assert!(store.get::<i64>("n").is_none());
    }

    #[test]
    fn test_other_secret_reads_none() {
        let area = MemoryStorage::new();
        keyed(&area).set("n", &1_i64).unwrap();

        let other = EncryptedStore::new(area.clone(), Some("another-secret"));
        assert!(other.get::<i64>("n").is_none());
    }

    #[test]
    fn test_keyless_store_is_silent_noop() {
        let area = MemoryStorage::new();
        let store = EncryptedStore::new(area.clone(), None);
        assert!(!store.is_keyed());

        store.set("n", &1_i64).unwrap();
        assert!(area.is_empty());

        // Ciphertext left by a keyed store is unreadable without a secret
        keyed(&area).set("n", &1_i64).unwrap();
        assert!(matches!(store.try_get::<i64>("n"), Err(StoreError::MissingSecret)));
        assert!(store.get::<i64>("n").is_none());

        let empty = EncryptedStore::new(area, Some(""));
        assert!(!empty.is_keyed());
    }

    #[test]
    fn test_quota_error_propagates() {
        let area = MemoryStorage::with_quota(16);
        let store = keyed(&area);
        let err = store.set("big", &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, StoreError::Storage(StorageError::QuotaExceeded { .. })));
    }

    #[test]
    fn test_remove_is_unconditional() {
        let area = MemoryStorage::new();
        let store = keyed(&area);
        store.remove("missing");

        store.set("n", &1_i64).unwrap();
        store.remove("n");
        assert!(store.get::<i64>("n").is_none());
        assert!(area.is_empty());
    }
}
