use anyhow::{anyhow, Result};

use crate::cmd::context::Session;
use crate::config::CONFIG_FILE;
use crate::docker::{compose, ComposeAction};

impl Session {
    /// Build or start the project's containers locally
    pub async fn docker(&self, action: ComposeAction) -> Result<()> {
        let docker = self
            .ctx
            .config
            .docker
            .as_ref()
            .ok_or_else(|| anyhow!("No docker section in {CONFIG_FILE}"))?;
        compose(&self.ctx.project_root, &docker.compose_file, action, &self.cancel).await
    }
}
