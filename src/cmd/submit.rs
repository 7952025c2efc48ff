use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};

use crate::cmd::context::Session;
use crate::db::submission::{StatusSnapshot, SubmissionRecord};
use crate::lsf::submit::{submit, Submission};

impl Session {
    /// Confirm, sync, submit `script` (relative to the project root) and record the submission
    ///
    /// With `split > 1` the script is submitted that many times, each part waiting for the
    /// previous one to end, and all parts are recorded as one logical submission.
    /// Returns `None` if the user declined.
    pub async fn submit(&mut self, script: &str, split: usize) -> Result<Option<SubmissionRecord>> {
        let branch = self.branch()?;
        let profile = self.ctx.profile.clone();
        let question = self.describe(script, &branch, profile.as_deref())?;
        if !self.confirm.confirm(&question) {
            info!("Submission of {script} cancelled");
            return Ok(None);
        }
        self.submit_confirmed(script, &branch, profile.as_deref(), split).await.map(Some)
    }

    /// Submit the script of an earlier submission again, as a new submission
    ///
    /// `job_id` may be any of the earlier submission's ids; without it the latest submission is
    /// used. Its profile is reused unless one was given on the command line.
    pub async fn resubmit(&mut self, job_id: Option<&str>) -> Result<Option<SubmissionRecord>> {
        let original = match job_id {
            Some(id) => self
                .store
                .find_by_job_id(id)?
                .ok_or_else(|| anyhow!("Job {id} is not in the submission history"))?,
            None => self.store.latest()?.ok_or_else(|| anyhow!("The submission history is empty"))?,
        };
        let branch = self.branch()?;
        if original.branch != branch {
            warn!(
                "Submission {} was made on branch {}, resubmitting from {branch}",
                original.id, original.branch
            );
        }

        let script = original.job_script_path;
        let profile = self.ctx.profile.clone().or(original.profile);
        let question = self.describe(&script, &branch, profile.as_deref())?;
        if !self.confirm.confirm(&question) {
            info!("Resubmission of {script} cancelled");
            return Ok(None);
        }
        self.submit_confirmed(&script, &branch, profile.as_deref(), 1).await.map(Some)
    }

    fn describe(&self, script: &str, branch: &str, profile: Option<&str>) -> Result<String> {
        let path = self.ctx.project_root.join(script);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Can't read job script {}", path.display()))?;
        let profile = profile.map(|p| format!(" with profile {p}")).unwrap_or_default();
        let rule = "-".repeat(40);
        Ok(format!("{rule}\n{content}\nSubmit {script} from branch {branch}{profile}?"))
    }

    /// Runs after confirmation: whatever was confirmed is what gets synchronised
    async fn submit_confirmed(
        &mut self,
        script: &str,
        branch: &str,
        profile: Option<&str>,
        split: usize,
    ) -> Result<SubmissionRecord> {
        self.sync().await.context("Sync failed, nothing was submitted")?;
        if self.cancel.is_cancelled() {
            bail!("Interrupted, nothing was submitted");
        }

        let extra_args = self.ctx.config.submit_args(profile)?;
        let remote_root = self.ctx.remote_path();
        let timeout = self.ctx.config.timeouts().bulk;
        let submission = Submission {
            remote_root: &remote_root,
            script,
            extra_args: &extra_args,
            depends_on: None,
        };

        let job_ids = submit(self.executor.as_ref(), &submission, timeout).await?;
        let record = SubmissionRecord::new(branch, script, profile, job_ids);
        let id = self.store.append(&record)?;
        let mut record = SubmissionRecord { id, ..record };

        let parts = split.max(1);
        for part in 2..=parts {
            let previous = record.scheduler_job_ids.last().cloned().unwrap_or_default();
            let chained = Submission { depends_on: Some(&previous), ..submission };
            match submit(self.executor.as_ref(), &chained, timeout).await {
                Ok(job_ids) => record = self.store.attach_job_ids(id, &job_ids)?,
                Err(err) => {
                    let note = format!("part {part} of {parts} failed: {err}");
                    let snapshot = StatusSnapshot::now("split-incomplete", Some(note));
                    self.store.refresh_status(id, &snapshot)?;
                    let submitted = part - 1;
                    let message = format!("Only {submitted} of {parts} parts were submitted");
                    return Err(err).context(message);
                }
            }
        }

        Ok(record)
    }
}
