use log::info;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};

use crate::db::open::HistoryStore;
use crate::db::submission::{StatusSnapshot, SubmissionRecord};
use crate::error::HistoryError;

impl HistoryStore {
    /// Add scheduler ids produced by a split of an existing submission
    ///
    /// Ids already on the record are ignored, so repeating a call changes nothing.
    pub fn attach_job_ids(
        &mut self,
        record_id: i64,
        extra_ids: &[String],
    ) -> Result<SubmissionRecord, HistoryError> {
        self.modify(record_id, |doc| {
            let ids = doc
                .get_mut("scheduler_job_ids")
                .and_then(Value::as_array_mut)
                .ok_or(HistoryError::Corrupt(record_id))?;
            let mut changed = false;
            for id in extra_ids {
                if !ids.iter().any(|existing| existing.as_str() == Some(id.as_str())) {
                    info!("Attaching job id {id} to submission {record_id}");
                    ids.push(Value::String(id.clone()));
                    changed = true;
                }
            }
            Ok(changed)
        })
    }

    /// Replace the record's status snapshot
    pub fn refresh_status(
        &mut self,
        record_id: i64,
        snapshot: &StatusSnapshot,
    ) -> Result<SubmissionRecord, HistoryError> {
        let value = serde_json::to_value(snapshot)?;
        self.modify(record_id, |doc| {
            doc.insert("status_snapshot".to_string(), value);
            Ok(true)
        })
    }

    /// Read-modify-write one record inside an immediate transaction
    ///
    /// The JSON document is edited in place rather than round-tripped through
    /// [`SubmissionRecord`], so fields written by newer versions are preserved.
    fn modify<F>(&mut self, record_id: i64, edit: F) -> Result<SubmissionRecord, HistoryError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<bool, HistoryError>,
    {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let json: String = tx
            .query_row("SELECT record FROM submission WHERE id = ?1", [record_id], |row| row.get(0))
            .optional()?
            .ok_or(HistoryError::UnknownRecord(record_id))?;

        let corrupt = |_| HistoryError::Corrupt(record_id);
        let mut doc: Value = serde_json::from_str(&json).map_err(corrupt)?;
        let fields = doc.as_object_mut().ok_or(HistoryError::Corrupt(record_id))?;
        if edit(fields)? {
            let update = "UPDATE submission SET record = ?1 WHERE id = ?2";
            tx.execute(update, params![doc.to_string(), record_id])?;
        }
        tx.commit()?;

        let mut record: SubmissionRecord = serde_json::from_value(doc).map_err(corrupt)?;
        record.id = record_id;
        Ok(record)
    }
}
