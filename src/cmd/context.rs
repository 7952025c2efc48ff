use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use log::warn;
use tokio_util::sync::CancellationToken;

use crate::config::CliConfig;
use crate::db::open::HistoryStore;
use crate::remote::exec::{Output, RemoteExecutor, Timeout};
use crate::vcs::VersionControl;

/// Everything a command needs to know about where and as what it runs
#[derive(Clone, Debug)]
pub struct Context {
    pub project_root: PathBuf,
    /// `--branch`; otherwise asked from version control when a command needs it
    pub branch: Option<String>,
    pub profile: Option<String>,
    pub config: CliConfig,
    pub sync_enabled: bool,
}

impl Context {
    pub fn new(
        project_root: PathBuf,
        config: CliConfig,
        branch: Option<String>,
        profile: Option<String>,
        no_sync: bool,
    ) -> Context {
        let sync_enabled = config.sync.enabled && !no_sync;
        Context { project_root, branch, profile, config, sync_enabled }
    }

    pub fn remote_path(&self) -> String {
        self.config.remote_path(&self.project_root)
    }
}

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Interactive prompt on stdin/stderr
pub struct Prompt;

impl Confirm for Prompt {
    fn confirm(&self, question: &str) -> bool {
        eprint!("{question} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                warn!("Can't read answer: {err}");
                false
            }
        }
    }
}

/// `--yes`
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

pub struct Session {
    pub ctx: Context,
    pub executor: Arc<dyn RemoteExecutor>,
    pub vcs: Box<dyn VersionControl>,
    pub confirm: Box<dyn Confirm>,
    pub store: HistoryStore,
    pub cancel: CancellationToken,
}

impl Session {
    pub fn new(
        ctx: Context,
        executor: Arc<dyn RemoteExecutor>,
        vcs: Box<dyn VersionControl>,
        confirm: Box<dyn Confirm>,
        store: HistoryStore,
    ) -> Session {
        Session { ctx, executor, vcs, confirm, store, cancel: CancellationToken::new() }
    }

    /// The branch submissions are recorded under
    pub fn branch(&self) -> Result<String> {
        match &self.ctx.branch {
            Some(branch) => Ok(branch.clone()),
            None => self
                .vcs
                .active_branch(&self.ctx.project_root)
                .context("Can't determine the active branch, pass --branch"),
        }
    }

    /// Run `command` on the login node, giving up as soon as the session is interrupted
    ///
    /// Giving up drops the executor call, which kills the local ssh client.
    pub async fn run_remote(&self, command: &str, timeout: Timeout) -> Result<Output> {
        tokio::select! {
            output = self.executor.execute(command, timeout) => Ok(output?),
            _ = self.cancel.cancelled() => bail!("Interrupted while running `{command}`"),
        }
    }
}
