//! Environment-driven configuration for embedding the store.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TICKLOG_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TICKLOG_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TICKLOG_LOG_DIR";

/// Where the store keeps its blobs and whether/where it logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite blob file. `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default                              |
    /// |---------------------|--------------------------------------|
    /// | `TICKLOG_DB_PATH`   | unset (in-memory)                    |
    /// | `TICKLOG_LOG_LEVEL` | `debug` (debug build) / `info`       |
    /// | `TICKLOG_LOG_DIR`   | unset (no file logging)              |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            db_path: non_blank(DB_PATH_ENV).map(PathBuf::from),
            log_level: non_blank(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: non_blank(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
