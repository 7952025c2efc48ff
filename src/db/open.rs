use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use rusqlite::Connection;

use crate::error::HistoryError;

/// How long a writer waits for another process holding the database lock
static BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Append-only log of submissions
///
/// Each row holds one self-describing JSON record. Every write is a single SQLite transaction,
/// so a record is either fully visible or not visible at all, and concurrent CLI processes queue
/// on the database lock instead of interleaving writes.
pub struct HistoryStore {
    pub(crate) conn: Connection,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<HistoryStore, HistoryError> {
        if !path.exists() {
            info!("Creating new history database {}", path.display());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // switching to WAL takes the lock too
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        HistoryStore::init(conn)
    }

    pub fn open_in_memory() -> Result<HistoryStore, HistoryError> {
        HistoryStore::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<HistoryStore, HistoryError> {
        static SCHEMA: &str =
            include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/db/schema.sql"));
        conn.execute_batch(SCHEMA)?;
        Ok(HistoryStore { conn })
    }
}
