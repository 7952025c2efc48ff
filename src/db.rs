//! Submission history is stored in a SQLite database

/// Connect to the history database
pub mod open;
/// Submission records: append, query, and the post-creation updates
pub mod submission;
