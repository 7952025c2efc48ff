//! Submission records
//!
//! A record is created once the scheduler has accepted a job and is never rewritten afterwards,
//! with two exceptions: extra scheduler ids can be attached when a submission is split, and the
//! latest observed status can be refreshed. Records are stored as JSON documents, so fields added
//! later default to empty on old rows and fields unknown to this version survive updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod append;
pub mod load;
pub mod update;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    /// Local sequence number, assigned by the store
    #[serde(skip)]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub branch: String,
    pub job_script_path: String,
    #[serde(default)]
    pub profile: Option<String>,
    /// In split order; the first id is the original submission
    pub scheduler_job_ids: Vec<String>,
    #[serde(default)]
    pub status_snapshot: Option<StatusSnapshot>,
}

impl SubmissionRecord {
    pub fn new(
        branch: &str,
        job_script_path: &str,
        profile: Option<&str>,
        scheduler_job_ids: Vec<String>,
    ) -> SubmissionRecord {
        SubmissionRecord {
            id: 0,
            timestamp: Utc::now(),
            branch: branch.to_string(),
            job_script_path: job_script_path.to_string(),
            profile: profile.map(str::to_string),
            scheduler_job_ids,
            status_snapshot: None,
        }
    }

    pub fn owns(&self, job_id: &str) -> bool {
        self.scheduler_job_ids.iter().any(|id| id == job_id)
    }
}

/// Last known state of a submission, as observed by this tool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: String,
    #[serde(default)]
    pub note: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn now(state: &str, note: Option<String>) -> StatusSnapshot {
        StatusSnapshot { state: state.to_string(), note, observed_at: Utc::now() }
    }
}
