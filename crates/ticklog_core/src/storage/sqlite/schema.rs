//! `kv_blobs` table layout, versioned through `PRAGMA user_version`.
//!
//! Entry `n` of `UPGRADES` moves a file from version `n` to `n + 1`; entries
//! are append-only.

use crate::storage::{AdapterError, AdapterResult};
use log::info;
use rusqlite::Connection;

const UPGRADES: &[&str] = &[include_str!("0001_kv_blobs.sql")];

/// Blob table version written by this build.
pub fn schema_version() -> u32 {
    UPGRADES.len() as u32
}

pub(super) fn stored_version(conn: &Connection) -> AdapterResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the blob table up to `schema_version()` in one transaction.
///
/// # Errors
/// - `UnsupportedSchema` when the file was written by a newer build.
pub(super) fn upgrade(conn: &mut Connection) -> AdapterResult<()> {
    let found = stored_version(conn)?;
    let supported = schema_version();
    if found > supported {
        return Err(AdapterError::UnsupportedSchema { found, supported });
    }
    if found == supported {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for sql in &UPGRADES[found as usize..] {
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", supported)?;
    tx.commit()?;

    info!(
        "event=blob_schema_upgrade module=storage status=ok from_version={found} to_version={supported}"
    );
    Ok(())
}
