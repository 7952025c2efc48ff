use anyhow::Result;
use log::{info, warn};

use crate::cmd::context::Session;
use crate::db::submission::StatusSnapshot;
use crate::lsf::query::SchedulerCommand;
use crate::remote::exec::Output;
use crate::resolve::resolve;

pub struct Removal {
    pub job_ids: Vec<String>,
    pub output: Output,
}

impl Session {
    /// Kill every job of the submission `job_id` belongs to. `None` if the user declined.
    pub async fn remove(&mut self, job_id: &str) -> Result<Option<Removal>> {
        let resolved = resolve(&self.store, job_id)?;
        let question = format!("Remove job(s) {}?", resolved.job_ids.join(", "));
        if !self.confirm.confirm(&question) {
            info!("Removal of {job_id} cancelled");
            return Ok(None);
        }

        let kill = SchedulerCommand::Kill(resolved.job_ids.clone());
        let timeout = self.ctx.config.timeouts().interactive;
        let output = self.run_remote(&kill.render(), timeout).await?;
        // bkill exits non-zero when some of the jobs already finished
        if !output.success() {
            warn!("bkill exited with {}: {}", output.exit_code, output.stderr.trim());
        }

        if let Some(record) = resolved.record {
            self.store.refresh_status(record.id, &StatusSnapshot::now("removed", None))?;
        }
        Ok(Some(Removal { job_ids: resolved.job_ids, output }))
    }
}
