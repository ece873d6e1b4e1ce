//! SQLite-backed blob store.
//!
//! Calls run synchronously inside the returned futures; the store is a
//! single logical actor so there is no contention to offload.

mod schema;

pub use schema::schema_version;

use super::{AdapterError, AdapterResult, StorageAdapter};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub struct SqliteAdapter {
    conn: Mutex<Connection>,
}

impl SqliteAdapter {
    /// Opens (creating if needed) a blob store file and upgrades its table.
    ///
    /// # Errors
    /// - `UnsupportedSchema` for a file written by a newer build.
    /// - `Sqlite` when the file cannot be opened or upgraded.
    pub fn open(path: impl AsRef<Path>) -> AdapterResult<Self> {
        Self::open_with("file", || Connection::open(path))
    }

    pub fn open_in_memory() -> AdapterResult<Self> {
        Self::open_with("memory", Connection::open_in_memory)
    }

    /// `PRAGMA user_version` of the open file.
    pub fn stored_schema_version(&self) -> AdapterResult<u32> {
        schema::stored_version(&self.conn())
    }

    fn open_with(
        mode: &'static str,
        connect: impl FnOnce() -> rusqlite::Result<Connection>,
    ) -> AdapterResult<Self> {
        let started_at = Instant::now();
        let opened = connect().map_err(AdapterError::from).and_then(|mut conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            schema::upgrade(&mut conn)?;
            Ok(conn)
        });

        match opened {
            Ok(conn) => {
                info!(
                    "event=blob_store_open module=storage status=ok mode={mode} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    conn: Mutex::new(conn),
                })
            }
            Err(err) => {
                error!(
                    "event=blob_store_open module=storage status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageAdapter for SqliteAdapter {
    async fn get_data(&self, key: &str) -> AdapterResult<String> {
        let value: Option<String> = self
            .conn()
            .query_row(
                "SELECT blob_value FROM kv_blobs WHERE blob_key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        value.ok_or_else(|| AdapterError::KeyNotFound(key.to_string()))
    }

    async fn set_data(&self, key: &str, value: &str) -> AdapterResult<()> {
        self.conn().execute(
            "INSERT INTO kv_blobs (blob_key, blob_value) VALUES (?1, ?2)
             ON CONFLICT(blob_key) DO UPDATE SET blob_value = excluded.blob_value;",
            params![key, value],
        )?;
        Ok(())
    }
}
