//! hrdesk core - the client-side session layer of the hrdesk console.
//!
//! Screens ask a [`SessionManager`] whether to render, which identity to
//! attach to requests and when to send the user back to the login screen.
//! The manager keeps its state in an [`EncryptedStore`] so a session survives
//! reloads of the same tab-group for up to 24 hours.

pub mod auth;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod store;

pub use auth::{InvalidationReason, SessionEvent, SessionManager, SessionScope, SESSION_TIMEOUT_MS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use crypto::StaticCipher;
pub use error::{CipherError, StorageError, StoreError, UsageError};
pub use models::{LoginResponse, UserRecord};
pub use store::{EncryptedStore, FileStorage, MemoryStorage, StorageArea};
