//! Command orchestration: sync, submit, record, and the queries built on history
//!
//! Each command runs as one sequential pipeline on a [`context::Session`]. No step that changes
//! remote state runs after an earlier step of the same command failed.

/// Resolved branch/profile/configuration and the collaborators a command needs
pub mod context;
pub mod sync;
pub mod install;
/// submit and resubmit
pub mod submit;
pub mod remove;
/// queue, stats and start-time
pub mod status;
pub mod history;
/// docker build and up
pub mod docker;
