use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::types::Value;

use crate::db::open::HistoryStore;
use crate::db::submission::SubmissionRecord;
use crate::error::HistoryError;

/// Number of records shown when no limit is given
pub static DEFAULT_LIMIT: usize = 5;

/// Filter over the submission history
///
/// `limit` keeps the most recent matches. `0` means unlimited and has to be asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryQuery {
    pub branch: Option<String>,
    pub profile: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        HistoryQuery { branch: None, profile: None, since: None, until: None, limit: DEFAULT_LIMIT }
    }
}

impl HistoryQuery {
    pub fn limit(mut self, limit: usize) -> HistoryQuery {
        self.limit = limit;
        self
    }

    fn matches(&self, record: &SubmissionRecord) -> bool {
        let branch = self.branch.as_ref().map_or(true, |b| &record.branch == b);
        let profile = self.profile.as_ref().map_or(true, |p| record.profile.as_ref() == Some(p));
        let since = self.since.map_or(true, |t| record.timestamp >= t);
        let until = self.until.map_or(true, |t| record.timestamp <= t);
        branch && profile && since && until
    }
}

impl HistoryStore {
    /// Matching records, oldest first
    pub fn query(&self, filter: &HistoryQuery) -> Result<Vec<SubmissionRecord>, HistoryError> {
        let matching: Vec<SubmissionRecord> =
            self.load_all()?.into_iter().filter(|r| filter.matches(r)).collect();
        let skip = match filter.limit {
            0 => 0,
            limit => matching.len().saturating_sub(limit),
        };
        Ok(matching.into_iter().skip(skip).collect())
    }

    /// The record owning `job_id`, whichever of its split ids it is
    ///
    /// If a scheduler ever reuses an id, the most recent owner wins.
    pub fn find_by_job_id(&self, job_id: &str) -> Result<Option<SubmissionRecord>, HistoryError> {
        Ok(self.load_all()?.into_iter().rev().find(|record| record.owns(job_id)))
    }

    pub fn latest(&self) -> Result<Option<SubmissionRecord>, HistoryError> {
        Ok(self.load_all()?.pop())
    }

    /// Every readable record in creation order. Corrupt rows are skipped with a warning.
    fn load_all(&self) -> Result<Vec<SubmissionRecord>, HistoryError> {
        let mut stmt = self.conn.prepare("SELECT id, record FROM submission ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Value>(1)?)))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, value) = row?;
            match parse(id, value) {
                Some(record) => records.push(record),
                None => warn!("Skipping corrupt submission record {id}"),
            }
        }
        Ok(records)
    }
}

fn parse(id: i64, value: Value) -> Option<SubmissionRecord> {
    let Value::Text(json) = value else { return None };
    let mut record: SubmissionRecord = serde_json::from_str(&json).ok()?;
    record.id = id;
    Some(record)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(branch: &str, profile: Option<&str>, job_id: &str, day: u32) -> SubmissionRecord {
        let mut record = SubmissionRecord::new(branch, "job.sh", profile, vec![job_id.to_string()]);
        record.timestamp = Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap();
        record
    }

    fn store_with(records: &[SubmissionRecord]) -> HistoryStore {
        let store = HistoryStore::open_in_memory().unwrap();
        for r in records {
            store.append(r).unwrap();
        }
        store
    }

    fn job_ids(records: &[SubmissionRecord]) -> Vec<&str> {
        records.iter().map(|r| r.scheduler_job_ids[0].as_str()).collect()
    }

    #[test]
    fn default_shows_five_most_recent_oldest_first() {
        let records: Vec<_> = (1..=7).map(|i| record("main", None, &format!("{i}"), i)).collect();
        let store = store_with(&records);

        let shown = store.query(&HistoryQuery::default()).unwrap();
        assert_eq!(job_ids(&shown), vec!["3", "4", "5", "6", "7"]);
    }

    #[test]
    fn zero_limit_returns_everything_in_creation_order() {
        let records: Vec<_> = (1..=7).map(|i| record("main", None, &format!("{i}"), i)).collect();
        let store = store_with(&records);

        let shown = store.query(&HistoryQuery::default().limit(0)).unwrap();
        assert_eq!(job_ids(&shown), vec!["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn filters_by_branch_profile_and_date() {
        let store = store_with(&[
            record("main", None, "1", 1),
            record("exp", Some("gpu"), "2", 2),
            record("exp", None, "3", 3),
            record("exp", Some("gpu"), "4", 10),
        ]);

        let exp = HistoryQuery { branch: Some("exp".into()), ..HistoryQuery::default() };
        assert_eq!(job_ids(&store.query(&exp).unwrap()), vec!["2", "3", "4"]);

        let gpu = HistoryQuery { profile: Some("gpu".into()), ..HistoryQuery::default() };
        assert_eq!(job_ids(&store.query(&gpu).unwrap()), vec!["2", "4"]);

        let early = HistoryQuery {
            since: Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()),
            until: Some(Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap()),
            ..HistoryQuery::default()
        };
        assert_eq!(job_ids(&store.query(&early).unwrap()), vec!["2", "3"]);
    }

    #[test]
    fn corrupt_rows_are_skipped() {
        let store = store_with(&[record("main", None, "1", 1)]);
        store.conn.execute("INSERT INTO submission (record) VALUES ('{not json')", []).unwrap();
        store.conn.execute("INSERT INTO submission (record) VALUES (x'00ff')", []).unwrap();
        store.append(&record("main", None, "2", 2)).unwrap();

        let shown = store.query(&HistoryQuery::default()).unwrap();
        assert_eq!(job_ids(&shown), vec!["1", "2"]);
    }

    #[test]
    fn old_and_new_record_shapes_both_load() {
        let store = HistoryStore::open_in_memory().unwrap();
        // written before profiles and status snapshots existed
        let old = concat!(
            r#"{"timestamp":"2026-01-01T00:00:00Z","branch":"main","job_script_path":"a.sh","#,
            r#""scheduler_job_ids":["11"]}"#,
        );
        // written by a newer version with an extra field
        let new = concat!(
            r#"{"timestamp":"2026-01-02T00:00:00Z","branch":"main","job_script_path":"a.sh","#,
            r#""scheduler_job_ids":["12"],"cluster":"hpc2"}"#,
        );
        store.conn.execute("INSERT INTO submission (record) VALUES (?1)", [old]).unwrap();
        store.conn.execute("INSERT INTO submission (record) VALUES (?1)", [new]).unwrap();

        let shown = store.query(&HistoryQuery::default()).unwrap();
        assert_eq!(job_ids(&shown), vec!["11", "12"]);
        assert_eq!(shown[0].profile, None);
        assert_eq!(shown[0].status_snapshot, None);
    }

    #[test]
    fn finds_record_by_any_split_id() {
        let mut split = record("main", None, "101", 1);
        split.scheduler_job_ids = vec!["101".into(), "102".into(), "103".into()];
        let store = store_with(&[record("main", None, "99", 1), split]);

        let found = store.find_by_job_id("102").unwrap().unwrap();
        assert_eq!(found.scheduler_job_ids, vec!["101", "102", "103"]);
        assert!(store.find_by_job_id("999").unwrap().is_none());
    }

    #[test]
    fn latest_is_the_last_appended() {
        let store = store_with(&[record("main", None, "1", 5), record("main", None, "2", 1)]);
        assert_eq!(store.latest().unwrap().unwrap().scheduler_job_ids, vec!["2"]);
        assert!(HistoryStore::open_in_memory().unwrap().latest().unwrap().is_none());
    }
}
