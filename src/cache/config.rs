//! Cache configuration.
//!
//! Controls the staleness window and the optional snapshot file via the
//! `[cache]` section of `fiidbak.toml`.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STALE_AFTER_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Age after which a populated collection counts as stale.
    pub stale_after: Duration,
    /// Where the products snapshot is persisted between runs.
    pub persist_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            persist_path: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            stale_after: Duration::from_secs(settings.stale_after_seconds.get()),
            persist_path: settings.persist_path.clone(),
        }
    }
}
