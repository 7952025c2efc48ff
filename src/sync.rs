//! One-way synchronisation of the local project tree to the cluster
//!
//! Local state is authoritative. Files are compared by content fingerprint, never by timestamp,
//! so clock skew between the workstation and the login node can't cause spurious uploads.

/// Enumerate local files into fingerprinted entries
pub mod scan;
/// Enumerate and mutate the remote copy of the tree
pub mod remote_tree;
/// Diff local and remote trees
pub mod plan;
/// Execute a plan against the remote tree
pub mod apply;
/// Scan, list, plan and apply in one call
pub mod engine;
