//! Application configuration management.
//!
//! Configuration comes from the environment:
//! - `HRDESK_SESSION_SECRET`: secret for the session store cipher. When unset
//!   at runtime, the value present at build time is used. Without either,
//!   sessions are kept in memory only.
//! - `HRDESK_STORAGE_DIR`: where tab-group storage lives. Defaults to
//!   `<cache dir>/hrdesk/session`.

use std::path::PathBuf;

use anyhow::Result;

use crate::store::{EncryptedStore, FileStorage};

/// Application name used for cache directory paths
const APP_NAME: &str = "hrdesk";

/// Sub-directory holding tab-group storage areas
const SESSION_DIR: &str = "session";

/// Tab-group used when none is named
pub const DEFAULT_TAB: &str = "default";

pub const SECRET_VAR: &str = "HRDESK_SESSION_SECRET";
pub const STORAGE_DIR_VAR: &str = "HRDESK_STORAGE_DIR";

/// Secret baked in at build time, if any.
const BUILD_SECRET: Option<&str> = option_env!("HRDESK_SESSION_SECRET");

#[derive(Clone, Default)]
pub struct Config {
    pub session_secret: Option<String>,
    pub storage_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<set>"))
            .field("storage_dir", &self.storage_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_secret = non_empty(SECRET_VAR)
            .or_else(|| BUILD_SECRET.filter(|s| !s.is_empty()).map(str::to_string));

        Self {
            session_secret,
            storage_dir: non_empty(STORAGE_DIR_VAR).map(PathBuf::from),
        }
    }

    pub fn has_secret(&self) -> bool {
        self.session_secret.is_some()
    }

    /// Storage directory for one tab-group.
    pub fn tab_dir(&self, tab: &str) -> Result<PathBuf> {
        let base = match &self.storage_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?
                .join(APP_NAME)
                .join(SESSION_DIR),
        };
        Ok(base.join(tab))
    }

    /// File-backed encrypted store for one tab-group.
    pub fn open_store(&self, tab: &str) -> Result<EncryptedStore> {
        let storage = FileStorage::new(self.tab_dir(tab)?)?;
        Ok(EncryptedStore::new(storage, self.session_secret.as_deref()))
    }
}
