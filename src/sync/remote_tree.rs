use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{RemoteError, SyncError};
use crate::remote::exec::{Output, RemoteExecutor, Timeouts};
use crate::remote::quote::{join, parent, quote, quote_path};
use crate::sync::scan::{FileEntry, FileTree, Fingerprint, IgnoreList};

/// `find` action printing each regular file as `sha256<TAB>size<TAB>mtime<TAB>path`
static LIST_FILES: &str = concat!(
    r#"-type f -exec sh -c 'for f; do printf "%s\t%s\t%s\t%s\n" "#,
    r#""$(sha256sum < "$f" | cut -d " " -f 1)" "$(stat -c %s "$f")" "$(stat -c %Y "$f")" "#,
    r#""${f#./}"; done' sh {} +"#,
);

/// The remote copy of the project tree, rooted at `root` on the login node
pub struct RemoteTree {
    executor: Arc<dyn RemoteExecutor>,
    root: String,
    timeouts: Timeouts,
}

impl RemoteTree {
    pub fn new(executor: Arc<dyn RemoteExecutor>, root: &str, timeouts: Timeouts) -> RemoteTree {
        RemoteTree { executor, root: root.trim_end_matches('/').to_string(), timeouts }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Fingerprint the remote tree. A missing root lists as empty.
    ///
    /// Ignored directories are pruned remotely, and anything matching `ignore` that still comes
    /// back is dropped, so files excluded from sync (job output, virtualenvs) are never
    /// scheduled for deletion. Transient failures are retried once.
    pub async fn list(&self, ignore: &IgnoreList) -> Result<FileTree, SyncError> {
        let command = listing_command(&self.root, ignore);
        let output = match self.executor.execute(&command, self.timeouts.bulk).await {
            Err(err) if err.is_transient() => {
                warn!("Remote listing failed ({err}), retrying once");
                self.executor.execute(&command, self.timeouts.bulk).await?
            }
            other => other?,
        };
        if !output.success() {
            let stderr = output.stderr.trim().to_string();
            return Err(SyncError::Listing { exit_code: output.exit_code, stderr });
        }

        let mut tree = parse_listing(&output.stdout);
        tree.retain(|path, _| !ignore.is_ignored(path));
        info!("Found {} remote files under {}", tree.len(), self.root);
        Ok(tree)
    }

    /// Copy one local file over, creating parent directories as needed
    pub async fn upload(&self, local_root: &Path, relative_path: &str) -> Result<(), String> {
        let bytes = tokio::fs::read(local_root.join(relative_path))
            .await
            .map_err(|err| format!("can't read local file: {err}"))?;
        let target = join(&self.root, relative_path);
        let command =
            format!("mkdir -p {} && cat > {}", quote_path(parent(&target)), quote_path(&target));
        debug!("Uploading {relative_path} ({} bytes)", bytes.len());
        let output = self.executor.execute_with_input(&command, bytes, self.timeouts.bulk).await;
        check(output)
    }

    pub async fn delete(&self, relative_path: &str) -> Result<(), String> {
        let command = format!("rm -f -- {}", quote_path(&join(&self.root, relative_path)));
        debug!("Deleting remote {relative_path}");
        let output = self.executor.execute(&command, self.timeouts.bulk).await;
        check(output)
    }
}

fn check(output: Result<Output, RemoteError>) -> Result<(), String> {
    match output {
        Ok(output) if output.success() => Ok(()),
        Ok(output) => Err(format!("exit code {}: {}", output.exit_code, output.stderr.trim())),
        Err(err) => Err(err.to_string()),
    }
}

pub fn listing_command(root: &str, ignore: &IgnoreList) -> String {
    let root = quote_path(root);
    let prune = prune_clause(ignore);
    format!("if [ -d {root} ]; then cd {root} && find .{prune} {LIST_FILES}; fi")
}

/// `find` operands that skip ignored entries without descending into them
///
/// Single-component patterns match a name at any depth, the others match the whole path.
fn prune_clause(ignore: &IgnoreList) -> String {
    let tests: Vec<String> = ignore
        .patterns()
        .map(|pattern| {
            if pattern.contains('/') {
                format!("-path {}", quote(&format!("./{pattern}")))
            } else {
                format!("-name {}", quote(pattern))
            }
        })
        .collect();
    if tests.is_empty() {
        return String::new();
    }
    format!(r" \( {} \) -prune -o", tests.join(" -o "))
}

/// Parse listing output, skipping lines that don't have all four fields
pub fn parse_listing(stdout: &str) -> FileTree {
    let mut tree = FileTree::new();
    for line in stdout.lines().filter(|l| !l.is_empty()) {
        match parse_line(line) {
            Some(entry) => {
                tree.insert(entry.relative_path.clone(), entry);
            }
            None => warn!("Skipping unparseable remote listing line: {line:?}"),
        }
    }
    tree
}

fn parse_line(line: &str) -> Option<FileEntry> {
    let mut fields = line.splitn(4, '\t');
    let fingerprint = Fingerprint::from_hex(fields.next()?)?;
    let size = fields.next()?.parse().ok()?;
    let modified_time = fields.next()?.parse().ok()?;
    let relative_path = fields.next().filter(|p| !p.is_empty())?.to_string();
    Some(FileEntry { relative_path, fingerprint, size, modified_time })
}
