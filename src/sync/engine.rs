use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::sync::apply::{apply, SyncResult};
use crate::sync::plan::plan;
use crate::sync::remote_tree::RemoteTree;
use crate::sync::scan::{scan, IgnoreList};

pub struct SyncOptions {
    pub workers: usize,
    /// Obtained from version control by the caller before syncing
    pub uncommitted_changes: bool,
}

/// Make the remote tree match `local_root`
///
/// Uncommitted changes only produce a warning here: whether to go ahead was decided by the caller.
/// Cancellation during the listing returns [`SyncError::Cancelled`] with nothing changed. Anything
/// else short of a complete sync is returned as [`SyncError::Incomplete`].
pub async fn synchronize(
    local_root: &Path,
    ignore: &IgnoreList,
    tree: Arc<RemoteTree>,
    options: &SyncOptions,
    cancel: &CancellationToken,
) -> Result<SyncResult, SyncError> {
    if options.uncommitted_changes {
        warn!("Working tree has uncommitted changes, they will be synchronised as-is");
    }

    let local = scan(local_root, ignore)?;
    let remote = tokio::select! {
        listed = tree.list(ignore) => listed?,
        _ = cancel.cancelled() => return Err(SyncError::Cancelled),
    };
    let plan = plan(&local, &remote);
    if plan.is_empty() {
        info!("Remote tree {} is up to date", tree.root());
    }

    let mut result = apply(plan, tree, local_root, options.workers, cancel).await;
    result.uncommitted_changes = options.uncommitted_changes;

    if !result.is_complete() {
        return Err(SyncError::Incomplete(result));
    }
    info!("Sync finished: {}", result.summary());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::remote::exec::Timeouts;
    use crate::remote::fake::FakeExecutor;
    use crate::sync::scan::Fingerprint;

    static LISTING: &str = "-type f -exec";

    fn listing(files: &[(&str, &str)]) -> String {
        files
            .iter()
            .map(|(path, content)| {
                let fingerprint = Fingerprint::of(content.as_bytes());
                format!("{}\t{}\t0\t{}\n", fingerprint, content.len(), path)
            })
            .collect()
    }

    fn options() -> SyncOptions {
        SyncOptions { workers: 2, uncommitted_changes: false }
    }

    fn remote(fake: &Arc<FakeExecutor>) -> Arc<RemoteTree> {
        Arc::new(RemoteTree::new(fake.clone(), "~/proj", Timeouts::default()))
    }

    async fn sync(root: &Path, fake: &Arc<FakeExecutor>) -> Result<SyncResult, SyncError> {
        let ignore = IgnoreList::default();
        synchronize(root, &ignore, remote(fake), &options(), &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn uploads_new_files_and_deletes_stale_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::write(dir.path().join("b.txt"), "y").unwrap();
        let stale = listing(&[("a.txt", "x"), ("c.txt", "z")]);
        let fake = Arc::new(FakeExecutor::new().respond(LISTING, &stale));

        let result = sync(dir.path(), &fake).await.unwrap();

        assert_eq!((result.uploaded, result.deleted), (1, 1));
        let inputs = fake.inputs();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].0.ends_with("cat > \"$HOME\"/'proj/b.txt'"));
        assert_eq!(fake.commands_containing("rm -f -- \"$HOME\"/'proj/c.txt'").len(), 1);
        assert!(fake.commands_containing("a.txt").is_empty());
    }

    #[tokio::test]
    async fn unchanged_tree_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let fake = Arc::new(FakeExecutor::new().respond(LISTING, &listing(&[("a.txt", "x")])));

        let result = sync(dir.path(), &fake).await.unwrap();

        assert_eq!((result.uploaded, result.deleted), (0, 0));
        assert_eq!(fake.commands().len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_is_an_incomplete_sync() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let fake = Arc::new(FakeExecutor::new().fail("cat >"));

        let options = SyncOptions { workers: 1, uncommitted_changes: true };
        let ignore = IgnoreList::default();
        let cancel = CancellationToken::new();
        let err = synchronize(dir.path(), &ignore, remote(&fake), &options, &cancel)
            .await
            .unwrap_err();

        match err {
            SyncError::Incomplete(result) => {
                assert_eq!(result.failures.len(), 1);
                assert!(result.uncommitted_changes);
            }
            other => panic!("expected incomplete sync, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_root_aborts_before_touching_remote() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeExecutor::new());

        let err = sync(&dir.path().join("missing"), &fake).await.unwrap_err();

        assert!(matches!(err, SyncError::Scan(_)));
        assert!(fake.commands().is_empty());
    }

    #[tokio::test]
    async fn cancelling_a_slow_listing_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let fake = Arc::new(FakeExecutor::new().delay(LISTING, Duration::from_secs(3600)));
        let cancel = CancellationToken::new();
        let trip = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trip.cancel();
        });

        let ignore = IgnoreList::default();
        let options = options();
        let pending = synchronize(dir.path(), &ignore, remote(&fake), &options, &cancel);
        let err =
            tokio::time::timeout(Duration::from_secs(10), pending).await.unwrap().unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert!(fake.inputs().is_empty());
        assert_eq!(fake.commands().len(), 1);
    }
}
