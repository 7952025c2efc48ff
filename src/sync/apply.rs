use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::sync::plan::SyncPlan;
use crate::sync::remote_tree::RemoteTree;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncFailure {
    pub path: String,
    pub operation: Operation,
    pub reason: String,
}

/// What an `apply` actually did. Counts only cover operations that completed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub uploaded: usize,
    pub deleted: usize,
    pub failures: Vec<SyncFailure>,
    /// Operations never dispatched, because of cancellation or an earlier upload failure
    pub skipped: usize,
    pub uncommitted_changes: bool,
}

impl SyncResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("{} uploaded, {} deleted", self.uploaded, self.deleted);
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.skipped > 0 {
            summary.push_str(&format!(", {} skipped", self.skipped));
        }
        summary
    }

    fn record(&mut self, operation: Operation, path: String, outcome: Result<(), String>) {
        match (outcome, operation) {
            (Ok(()), Operation::Upload) => self.uploaded += 1,
            (Ok(()), Operation::Delete) => self.deleted += 1,
            (Err(reason), operation) => {
                warn!("Failed to {operation} {path}: {reason}");
                self.failures.push(SyncFailure { path, operation, reason });
            }
        }
    }
}

/// Carry out a plan, at most `workers` remote operations at a time
///
/// All uploads finish before any delete starts, so a renamed file is never missing from both
/// names. Deletes are skipped entirely if any upload failed. A failed entry doesn't stop the
/// others. Once `cancel` fires nothing new is dispatched; work already done stays done.
pub async fn apply(
    plan: SyncPlan,
    tree: Arc<RemoteTree>,
    local_root: &Path,
    workers: usize,
    cancel: &CancellationToken,
) -> SyncResult {
    let mut result = SyncResult::default();
    info!("Applying sync plan: {} uploads, {} deletes", plan.to_upload.len(), plan.to_delete.len());

    let uploads: Vec<String> =
        plan.to_upload.into_iter().map(|entry| entry.relative_path).collect();
    let upload_tree = tree.clone();
    let local_root: PathBuf = local_root.to_path_buf();
    run_batch(uploads, Operation::Upload, workers, cancel, &mut result, move |path| {
        let tree = upload_tree.clone();
        let local_root = local_root.clone();
        async move { tree.upload(&local_root, &path).await }
    })
    .await;

    if !result.is_complete() {
        warn!("Not deleting remote files because the upload phase did not complete");
        result.skipped += plan.to_delete.len();
        return result;
    }

    run_batch(plan.to_delete, Operation::Delete, workers, cancel, &mut result, move |path| {
        let tree = tree.clone();
        async move { tree.delete(&path).await }
    })
    .await;

    result
}

async fn run_batch<F, Fut>(
    paths: Vec<String>,
    operation: Operation,
    workers: usize,
    cancel: &CancellationToken,
    result: &mut SyncResult,
    task: F,
) where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), String>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut running = JoinSet::new();
    let mut pending = paths.into_iter();

    for path in pending.by_ref() {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        if cancel.is_cancelled() {
            info!("Sync cancelled, not starting {operation} of {path}");
            result.skipped += 1;
            break;
        }
        let work = task(path.clone());
        running.spawn(async move {
            let outcome = work.await;
            drop(permit);
            (path, outcome)
        });
    }
    result.skipped += pending.count();

    while let Some(joined) = running.join_next().await {
        match joined {
            Ok((path, outcome)) => result.record(operation, path, outcome),
            Err(err) => result.record(operation, String::from("<unknown>"), Err(err.to_string())),
        }
    }
}
