//! Backing adapters: the only durable medium the store writes to.
//!
//! # Responsibility
//! - Define the async key→string blob contract consumed by `EntityStore`.
//! - Provide in-memory and SQLite implementations.
//!
//! # Invariants
//! - `get_data` on an absent key is an error, never an empty string.
//! - `set_data` replaces the whole blob for a key.

mod memory;
mod sqlite;

pub use memory::MemoryAdapter;
pub use sqlite::{schema_version, SqliteAdapter};

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

/// Blob key holding the JSON array of projects.
pub const PROJECTS_KEY: &str = "projects";
/// Blob key holding the JSON array of time records.
pub const RECORDS_KEY: &str = "records";
/// Blob key holding the JSON timer state object.
pub const TIMER_KEY: &str = "timer";

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors raised by backing adapters.
#[derive(Debug)]
pub enum AdapterError {
    /// No blob is stored under the key.
    KeyNotFound(String),
    /// The write was refused by the medium.
    WriteRejected { key: String, reason: String },
    /// SQLite transport failure.
    Sqlite(rusqlite::Error),
    /// The blob table was written by a newer build.
    UnsupportedSchema { found: u32, supported: u32 },
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyNotFound(key) => write!(f, "no blob stored under key `{key}`"),
            Self::WriteRejected { key, reason } => {
                write!(f, "write to key `{key}` rejected: {reason}")
            }
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::UnsupportedSchema { found, supported } => write!(
                f,
                "blob table version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AdapterError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Async key→string blob store.
pub trait StorageAdapter {
    fn get_data(&self, key: &str) -> impl Future<Output = AdapterResult<String>>;
    fn set_data(&self, key: &str, value: &str) -> impl Future<Output = AdapterResult<()>>;
}
