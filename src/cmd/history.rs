use anyhow::Result;

use crate::cmd::context::Session;
use crate::db::submission::load::HistoryQuery;
use crate::db::submission::SubmissionRecord;

impl Session {
    /// Matching submissions, oldest first
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<SubmissionRecord>> {
        Ok(self.store.query(query)?)
    }
}

/// One line per submission
pub fn format_history(records: &[SubmissionRecord]) -> String {
    if records.is_empty() {
        return "No submissions found\n".to_string();
    }

    records
        .iter()
        .map(|record| {
            let status = record.status_snapshot.as_ref().map_or("-", |s| s.state.as_str());
            format!(
                "{}  {:<20} {:<12} {:<24} {:<10} {}\n",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.branch,
                record.profile.as_deref().unwrap_or("-"),
                record.scheduler_job_ids.join(","),
                status,
                record.job_script_path,
            )
        })
        .collect()
}
