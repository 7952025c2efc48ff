use log::info;

use crate::db::open::HistoryStore;
use crate::db::submission::SubmissionRecord;
use crate::error::HistoryError;

impl HistoryStore {
    /// Store a new record and return its id
    ///
    /// The id on `record` is ignored. Duplicate scheduler ids are dropped, keeping the first
    /// occurrence. A record without any scheduler id is refused: a submission that produced no
    /// job never reaches the history.
    pub fn append(&self, record: &SubmissionRecord) -> Result<i64, HistoryError> {
        let mut record = record.clone();
        record.scheduler_job_ids = unique(&record.scheduler_job_ids);
        if record.scheduler_job_ids.is_empty() {
            return Err(HistoryError::NoJobIds);
        }

        let json = serde_json::to_string(&record)?;
        self.conn.execute("INSERT INTO submission (record) VALUES (?1)", [&json])?;
        let id = self.conn.last_insert_rowid();
        info!("Recorded submission {id} with job ids {}", record.scheduler_job_ids.join(", "));
        Ok(id)
    }
}

pub(crate) fn unique(ids: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}
