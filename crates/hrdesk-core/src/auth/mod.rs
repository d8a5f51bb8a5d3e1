//! Authentication module for managing the local user session.
//!
//! This module provides:
//! - `SessionManager`: the single owner of the signed-in identity, persisted
//!   through an `EncryptedStore` and expiring 24 hours after its last write
//! - `SessionEvent`: broadcast to dependents when a session starts, changes
//!   or is invalidated
//! - `SessionScope`: the explicit context object screens receive the manager
//!   through

pub mod events;
pub mod scope;
pub mod session;

pub use events::{InvalidationReason, SessionEvent};
pub use scope::SessionScope;
pub use session::{SessionManager, SESSION_TIMEOUT_MS};
