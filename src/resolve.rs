//! Expand one scheduler job id to every id of its logical submission

use log::{info, warn};

use crate::db::open::HistoryStore;
use crate::db::submission::SubmissionRecord;
use crate::error::HistoryError;

/// All ids of a logical submission, with the owning record when history knows it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedJob {
    pub job_ids: Vec<String>,
    pub record: Option<SubmissionRecord>,
}

/// Look up the submission that `job_id` belongs to
///
/// Ids unknown to history resolve to themselves, so the caller still acts on the id it was given.
pub fn resolve(store: &HistoryStore, job_id: &str) -> Result<ResolvedJob, HistoryError> {
    match store.find_by_job_id(job_id)? {
        Some(record) => {
            let count = record.scheduler_job_ids.len();
            info!("Job {job_id} belongs to submission {} ({count} job ids)", record.id);
            Ok(ResolvedJob { job_ids: record.scheduler_job_ids.clone(), record: Some(record) })
        }
        None => {
            warn!("Job {job_id} is not in the submission history, only that id will be used");
            Ok(ResolvedJob { job_ids: vec![job_id.to_string()], record: None })
        }
    }
}

/// Every job id that has to be killed so no split part of the submission is left running
pub fn resolve_for_removal(
    store: &HistoryStore,
    job_id: &str,
) -> Result<Vec<String>, HistoryError> {
    Ok(resolve(store, job_id)?.job_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_ids_resolve_to_the_whole_submission() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        let id = store.append(&SubmissionRecord::new("main", "a.sh", None, ids(&["101"]))).unwrap();
        store.attach_job_ids(id, &ids(&["102", "103"])).unwrap();

        for seed in ["101", "102", "103"] {
            assert_eq!(resolve_for_removal(&store, seed).unwrap(), ids(&["101", "102", "103"]));
        }
    }

    #[test]
    fn unknown_id_resolves_to_itself() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.append(&SubmissionRecord::new("main", "a.sh", None, ids(&["101"]))).unwrap();

        let resolved = resolve(&store, "999").unwrap();
        assert_eq!(resolved.job_ids, ids(&["999"]));
        assert!(resolved.record.is_none());
    }

    #[test]
    fn unrelated_submissions_stay_separate() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.append(&SubmissionRecord::new("main", "a.sh", None, ids(&["1", "2"]))).unwrap();
        store.append(&SubmissionRecord::new("main", "b.sh", None, ids(&["3"]))).unwrap();

        assert_eq!(resolve_for_removal(&store, "3").unwrap(), ids(&["3"]));
    }
}
