use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteError;

/// How long a remote command may run before it is abandoned
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    Bounded(Duration),
    Unbounded,
}

impl Timeout {
    /// `0` seconds means no deadline
    pub fn from_secs(secs: u64) -> Timeout {
        match secs {
            0 => Timeout::Unbounded,
            n => Timeout::Bounded(Duration::from_secs(n)),
        }
    }
}

/// Per-call-site defaults. Status queries should fail fast, transfers and submissions shouldn't.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub interactive: Timeout,
    pub bulk: Timeout,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            interactive: Timeout::from_secs(30),
            bulk: Timeout::from_secs(3600),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl Output {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execute a shell command line on the remote host
///
/// Implementations return `Ok` whenever the command ran, whatever its exit code. Transport
/// problems are reported as [`RemoteError::Connection`] and deadlines as
/// [`RemoteError::Timeout`].
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, command: &str, timeout: Timeout) -> Result<Output, RemoteError>;

    /// Same as `execute`, with `input` written to the command's stdin
    async fn execute_with_input(
        &self,
        command: &str,
        input: Vec<u8>,
        timeout: Timeout,
    ) -> Result<Output, RemoteError>;
}

/// Await `work`, giving up with [`RemoteError::Timeout`] once a bounded deadline passes
pub async fn with_deadline<T, F>(work: F, timeout: Timeout) -> Result<T, RemoteError>
where
    F: Future<Output = T>,
{
    match timeout {
        Timeout::Unbounded => Ok(work.await),
        Timeout::Bounded(limit) => {
            tokio::time::timeout(limit, work).await.map_err(|_| RemoteError::Timeout(limit))
        }
    }
}
