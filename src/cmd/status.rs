use anyhow::{bail, Result};

use crate::cmd::context::Session;
use crate::lsf::query::SchedulerCommand;
use crate::remote::exec::Output;
use crate::resolve::resolve_for_removal;

impl Session {
    pub async fn queue(&self) -> Result<Output> {
        self.query(SchedulerCommand::Queue).await
    }

    /// Resource usage of the submission `job_id` belongs to, or of every job
    pub async fn stats(&self, job_id: Option<&str>) -> Result<Output> {
        let job_ids = match job_id {
            Some(job_id) => resolve_for_removal(&self.store, job_id)?,
            None => Vec::new(),
        };
        self.query(SchedulerCommand::Stats(job_ids)).await
    }

    /// Estimated start time of each job of the submission
    pub async fn start_time(&self, job_id: &str) -> Result<Vec<(String, Output)>> {
        let mut estimates = Vec::new();
        for id in resolve_for_removal(&self.store, job_id)? {
            let output = self.query(SchedulerCommand::StartTime(id.clone())).await?;
            estimates.push((id, output));
        }
        Ok(estimates)
    }

    async fn query(&self, command: SchedulerCommand) -> Result<Output> {
        let rendered = command.render();
        let output = self.run_remote(&rendered, self.ctx.config.timeouts().interactive).await?;
        if !output.success() {
            let stderr = output.stderr.trim();
            bail!("`{rendered}` failed with exit code {}: {stderr}", output.exit_code);
        }
        Ok(output)
    }
}
