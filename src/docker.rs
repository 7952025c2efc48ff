//! Local container builds through `docker compose`

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComposeAction {
    /// Build the images of every service
    Build,
    /// Start the services in the background
    Up,
}

impl ComposeAction {
    fn args(self) -> &'static [&'static str] {
        match self {
            ComposeAction::Build => &["build"],
            ComposeAction::Up => &["up", "-d"],
        }
    }
}

impl fmt::Display for ComposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.args().join(" ").as_str())
    }
}

/// `docker compose -f <compose_file> <action>`, run from `project_root`
fn compose_command(project_root: &Path, compose_file: &Path, action: ComposeAction) -> Command {
    let mut cmd = Command::new("docker");
    cmd.arg("compose").arg("-f").arg(compose_file).args(action.args());
    cmd.current_dir(project_root).kill_on_drop(true);
    cmd
}

/// Run compose with the terminal attached, stopping it if `cancel` fires
pub async fn compose(
    project_root: &Path,
    compose_file: &Path,
    action: ComposeAction,
    cancel: &CancellationToken,
) -> Result<()> {
    info!("Running docker compose {action} with {}", compose_file.display());
    let mut child = compose_command(project_root, compose_file, action)
        .spawn()
        .context("Can't run docker")?;
    let status = tokio::select! {
        status = child.wait() => status.context("Lost track of docker compose")?,
        _ = cancel.cancelled() => bail!("Interrupted, docker compose {action} was stopped"),
    };
    if !status.success() {
        bail!("docker compose {action} failed ({status})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[yare::parameterized(
        build = { ComposeAction::Build, &["compose", "-f", "docker/compose.yml", "build"] },
        up = { ComposeAction::Up, &["compose", "-f", "docker/compose.yml", "up", "-d"] },
    )]
    fn renders_compose_arguments(action: ComposeAction, expected: &[&str]) {
        let root = Path::new("/home/me/proj");
        let cmd = compose_command(root, Path::new("docker/compose.yml"), action);
        assert_eq!(cmd.as_std().get_program(), "docker");
        assert_eq!(args(&cmd), expected);
        assert_eq!(cmd.as_std().get_current_dir(), Some(Path::new("/home/me/proj")));
    }

    #[test]
    fn actions_display_as_subcommands() {
        assert_eq!(ComposeAction::Build.to_string(), "build");
        assert_eq!(ComposeAction::Up.to_string(), "up -d");
    }
}
