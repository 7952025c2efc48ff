use anyhow::{bail, Context, Result};
use log::info;

use crate::cmd::context::Session;
use crate::remote::exec::Output;
use crate::remote::quote::quote_path;

impl Session {
    /// Sync, then run the configured install commands from the remote project root
    pub async fn install(&self) -> Result<Output> {
        let commands = &self.ctx.config.install;
        if commands.is_empty() {
            bail!("No install commands configured");
        }

        self.sync().await.context("Sync failed, nothing was installed")?;
        if self.cancel.is_cancelled() {
            bail!("Interrupted, nothing was installed");
        }

        let remote_root = quote_path(&self.ctx.remote_path());
        let command = format!("cd {remote_root} && {}", commands.join(" && "));
        info!("Running {} install commands", commands.len());
        let output = self.run_remote(&command, self.ctx.config.timeouts().bulk).await?;
        if !output.success() {
            bail!("Install failed with exit code {}: {}", output.exit_code, output.stderr.trim());
        }
        Ok(output)
    }
}
