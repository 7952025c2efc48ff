//! Talk to the LSF scheduler on the login node

/// Render the bsub command line and read job ids back from its output
pub mod submit;
/// Queue, statistics, start-time and kill commands
pub mod query;
