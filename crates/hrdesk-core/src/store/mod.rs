//! Encrypted key/value persistence.
//!
//! This module provides:
//! - `StorageArea`: the raw string storage seam, with `MemoryStorage`
//!   (volatile, tab-scoped) and `FileStorage` (one directory per tab-group)
//! - `EncryptedStore`: serializes values to JSON and keeps only ciphertext
//!   in the storage area
//!
//! The store knows nothing about sessions; expiry and login semantics live
//! in `auth`.

pub mod encrypted;
pub mod storage;

pub use encrypted::EncryptedStore;
pub use storage::{FileStorage, MemoryStorage, StorageArea};
