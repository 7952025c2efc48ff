use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::SshConfig;
use crate::error::RemoteError;
use crate::remote::exec::{with_deadline, Output, RemoteExecutor, Timeout};

/// ssh reserves exit status 255 for its own failures
static SSH_FAILURE: i32 = 255;

/// Runs commands through the system OpenSSH client
///
/// Password prompts are disabled (`BatchMode=yes`), so authentication has to be set up with
/// keys or an agent beforehand. A command that outlives its timeout is killed locally, which
/// tears down the remote session.
pub struct SshExecutor {
    destination: String,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
}

impl SshExecutor {
    pub fn new(config: &SshConfig) -> SshExecutor {
        let destination = match &config.user {
            Some(user) => format!("{}@{}", user, config.hostname),
            None => config.hostname.clone(),
        };
        SshExecutor { destination, port: config.port, identity_file: config.identityfile.clone() }
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(["-o", "BatchMode=yes"]);
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(&self.destination).arg(remote_command);
        cmd
    }

    async fn run(
        &self,
        remote_command: &str,
        input: Option<Vec<u8>>,
        timeout: Timeout,
    ) -> Result<Output, RemoteError> {
        debug!("ssh {}: {}", self.destination, remote_command);
        run_child(self.command(remote_command), input, timeout).await
    }
}

/// Spawn `cmd`, feed it `input` and collect its output before the deadline
///
/// The child is killed if the deadline passes or the future is dropped.
async fn run_child(
    mut cmd: Command,
    input: Option<Vec<u8>>,
    timeout: Timeout,
) -> Result<Output, RemoteError> {
    cmd.stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = cmd.spawn()?;

    let work = async move {
        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(&bytes).await?;
            // remote side waits for EOF
            drop(stdin);
        }
        child.wait_with_output().await
    };
    let output = with_deadline(work, timeout)
        .await?
        .map_err(|err| RemoteError::Connection(err.to_string()))?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if exit_code == SSH_FAILURE {
        return Err(RemoteError::Connection(stderr.trim().to_string()));
    }

    Ok(Output { stdout: String::from_utf8_lossy(&output.stdout).into_owned(), stderr, exit_code })
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, command: &str, timeout: Timeout) -> Result<Output, RemoteError> {
        self.run(command, None, timeout).await
    }

    async fn execute_with_input(
        &self,
        command: &str,
        input: Vec<u8>,
        timeout: Timeout,
    ) -> Result<Output, RemoteError> {
        self.run(command, Some(input), timeout).await
    }
}
