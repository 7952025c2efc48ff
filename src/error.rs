use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::sync::apply::SyncResult;

/// Local file tree could not be enumerated. Scanning is all-or-nothing.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Can't read project root {path}: {source}")]
    Unreadable { path: PathBuf, source: std::io::Error },

    #[error("Can't walk project tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Can't read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote connection failed: {0}")]
    Connection(String),

    #[error("Remote command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Can't start remote shell: {0}")]
    Spawn(#[from] std::io::Error),
}

impl RemoteError {
    /// Connection and timeout failures are worth one retry on read-only commands
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Connection(_) | RemoteError::Timeout(_))
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Remote listing failed with exit code {exit_code}: {stderr}")]
    Listing { exit_code: i32, stderr: String },

    #[error("Sync interrupted before any remote file was changed")]
    Cancelled,

    #[error("Sync incomplete: {}", .0.summary())]
    Incomplete(SyncResult),
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Can't create history directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Can't serialise submission record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Submission record {0} is corrupt")]
    Corrupt(i64),

    #[error("A submission record needs at least one scheduler job id")]
    NoJobIds,

    #[error("No submission record with id {0}")]
    UnknownRecord(i64),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Scheduler rejected the job (exit code {exit_code}): {stderr}")]
    Rejected { exit_code: i32, stderr: String },

    #[error("Scheduler output contained no job id: {0}")]
    NoJobIds(String),

    #[error("Can't render submit command: {0}")]
    Template(#[from] tinytemplate::error::Error),
}
