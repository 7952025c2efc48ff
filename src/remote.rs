//! Run commands on the cluster login node

/// The executor capability and its timeout model
pub mod exec;
/// OpenSSH-backed executor
pub mod ssh;
/// POSIX shell quoting for remote command lines
pub mod quote;
#[cfg(test)]
pub mod fake;
