use log::info;
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::error::SubmitError;
use crate::remote::exec::{RemoteExecutor, Timeout};
use crate::remote::quote::{quote, quote_path};

/// One bsub call
pub struct Submission<'a> {
    /// Remote project root, the job runs from here
    pub remote_root: &'a str,
    /// Job script path relative to the project root
    pub script: &'a str,
    /// Extra bsub flags, from the selected profile
    pub extra_args: &'a [String],
    /// Start only once this job has ended (chained split parts)
    pub depends_on: Option<&'a str>,
}

/// Rendering context for the submit command. Every value is already shell-quoted.
#[derive(Serialize)]
struct SubmitContext {
    remote_path: String,
    script: String,
    extra_args: Vec<String>,
    dependency: Option<String>,
}

pub fn render_submit(submission: &Submission) -> Result<String, SubmitError> {
    /// included submit command template
    static SUBMIT: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/submit.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("submit", SUBMIT)?;

    let context = SubmitContext {
        remote_path: quote_path(submission.remote_root),
        script: quote(submission.script),
        extra_args: submission.extra_args.iter().map(|a| quote(a)).collect(),
        dependency: submission.depends_on.map(|id| quote(&format!("ended({id})"))),
    };
    Ok(tt.render("submit", &context)?.trim().to_string())
}

/// Every job id announced as `Job <N>` in bsub output, in order of appearance
///
/// More than one id means the scheduler split the submission.
pub fn parse_job_ids(output: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut rest = output;
    while let Some(start) = rest.find("Job <") {
        let after = &rest[start + "Job <".len()..];
        let Some(end) = after.find('>') else { break };
        let id = &after[..end];
        let numeric = !id.is_empty() && id.chars().all(|c| c.is_ascii_digit());
        if numeric && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
        rest = &after[end..];
    }
    ids
}

/// Submit a job script and return the scheduler ids it was given
///
/// Never retried: a lost reply may still have queued the job.
pub async fn submit(
    executor: &dyn RemoteExecutor,
    submission: &Submission<'_>,
    timeout: Timeout,
) -> Result<Vec<String>, SubmitError> {
    let command = render_submit(submission)?;
    info!("Submitting {} from {}", submission.script, submission.remote_root);
    let output = executor.execute(&command, timeout).await?;
    if !output.success() {
        let stderr = output.stderr.trim().to_string();
        return Err(SubmitError::Rejected { exit_code: output.exit_code, stderr });
    }

    let mut ids = parse_job_ids(&output.stdout);
    if ids.is_empty() {
        ids = parse_job_ids(&output.stderr);
    }
    if ids.is_empty() {
        return Err(SubmitError::NoJobIds(output.stdout.trim().to_string()));
    }
    info!("Scheduler accepted job ids {}", ids.join(", "));
    Ok(ids)
}
