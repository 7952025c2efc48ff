use crate::sync::scan::{FileEntry, FileTree};

/// Uploads and deletions that make the remote tree match the local one
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_upload: Vec<FileEntry>,
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }
}

/// A local file is uploaded when the remote lacks its path or holds different content. A remote
/// file is deleted when no local file has its path. Identical files are left alone.
pub fn plan(local: &FileTree, remote: &FileTree) -> SyncPlan {
    let to_upload = local
        .values()
        .filter(|entry| match remote.get(&entry.relative_path) {
            Some(existing) => existing.fingerprint != entry.fingerprint,
            None => true,
        })
        .cloned()
        .collect();

    let to_delete = remote
        .keys()
        .filter(|path| !local.contains_key(*path))
        .cloned()
        .collect();

    SyncPlan { to_upload, to_delete }
}
