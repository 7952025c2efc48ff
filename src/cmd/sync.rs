use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use crate::cmd::context::Session;
use crate::sync::apply::SyncResult;
use crate::sync::engine::{synchronize, SyncOptions};
use crate::sync::remote_tree::RemoteTree;
use crate::sync::scan::IgnoreList;

impl Session {
    /// Push the project tree to the cluster. `None` when sync is disabled.
    pub async fn sync(&self) -> Result<Option<SyncResult>> {
        if !self.ctx.sync_enabled {
            info!("Sync disabled, using remote tree as-is");
            return Ok(None);
        }

        let root = &self.ctx.project_root;
        let uncommitted_changes = self.vcs.has_uncommitted_changes(root).unwrap_or_else(|err| {
            warn!("Can't check for uncommitted changes: {err:#}");
            false
        });

        let config = &self.ctx.config;
        let ignore = IgnoreList::new(&config.sync.ignore)?;
        let remote_root = self.ctx.remote_path();
        let executor = self.executor.clone();
        let tree = Arc::new(RemoteTree::new(executor, &remote_root, config.timeouts()));
        let options = SyncOptions { workers: config.sync.workers, uncommitted_changes };

        let result = synchronize(root, &ignore, tree, &options, &self.cancel).await?;
        Ok(Some(result))
    }
}
