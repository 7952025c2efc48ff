//! Project configuration, read from `.hpcctl.json` in the project root
//!
//! Every field has a default so configuration files written for older versions keep loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::remote::exec::{Timeout, Timeouts};

pub static CONFIG_FILE: &str = ".hpcctl.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    pub ssh: SshConfig,
    /// Project root on the cluster. Defaults to `~/<local directory name>`.
    pub remote_path: Option<String>,
    /// Commands run remotely, in order, by `install`
    pub install: Vec<String>,
    pub sync: SyncConfig,
    pub timeouts: TimeoutConfig,
    /// Relative paths are taken from the project root
    pub history_path: Option<PathBuf>,
    pub profiles: BTreeMap<String, Profile>,
    /// Needed only by the `docker` commands
    pub docker: Option<DockerConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SshConfig {
    pub hostname: String,
    pub user: Option<String>,
    pub identityfile: Option<PathBuf>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Glob patterns never uploaded and never deleted remotely
    pub ignore: Vec<String>,
    /// Concurrent uploads/deletes
    pub workers: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            enabled: true,
            ignore: [".git", ".hpcctl", "__pycache__", "*.pyc", ".venv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            workers: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Relative paths are taken from the project root
    pub compose_file: PathBuf,
}

impl Default for DockerConfig {
    fn default() -> Self {
        DockerConfig { compose_file: PathBuf::from("docker-compose.yml") }
    }
}

/// Seconds; `0` disables the deadline
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Status queries: queue, stats, start-time, remove
    pub interactive_secs: u64,
    /// Sync transfers, install and submission
    pub bulk_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig { interactive_secs: 30, bulk_secs: 3600 }
    }
}

/// Named set of extra scheduler flags, selected with `--profile`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Profile {
    pub submit_args: Vec<String>,
}

impl CliConfig {
    pub fn load(project_root: &Path) -> Result<CliConfig> {
        let path = project_root.join(CONFIG_FILE);
        info!("Reading configuration {}", path.display());
        let text =
            fs::read_to_string(&path).with_context(|| format!("Can't read {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        if config.ssh.hostname.is_empty() {
            bail!("{} has no ssh.hostname", path.display());
        }
        Ok(config)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            interactive: Timeout::from_secs(self.timeouts.interactive_secs),
            bulk: Timeout::from_secs(self.timeouts.bulk_secs),
        }
    }

    pub fn remote_path(&self, project_root: &Path) -> String {
        match &self.remote_path {
            Some(path) => path.clone(),
            None => {
                let name = project_root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("~/{name}")
            }
        }
    }

    pub fn history_path(&self, project_root: &Path) -> PathBuf {
        let path =
            self.history_path.clone().unwrap_or_else(|| PathBuf::from(".hpcctl/history.db"));
        project_root.join(path)
    }

    /// Extra bsub flags for `profile`. Unknown profile names are an error.
    pub fn submit_args(&self, profile: Option<&str>) -> Result<Vec<String>> {
        match profile {
            None => Ok(Vec::new()),
            Some(name) => self
                .profiles
                .get(name)
                .map(|p| p.submit_args.clone())
                .ok_or_else(|| anyhow!("Unknown profile {name}")),
        }
    }
}

/// Nearest directory at or above `start` holding a configuration file
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start.ancestors().find(|dir| dir.join(CONFIG_FILE).is_file()).map(Path::to_path_buf)
}
