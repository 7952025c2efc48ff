//! In-process executor for tests: records every command and answers from a script

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::remote::exec::{Output, RemoteExecutor, Timeout};

type Hook = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Copy, Clone, Debug)]
enum Failure {
    Connection,
    Timeout,
}

impl Failure {
    fn error(self) -> RemoteError {
        match self {
            Failure::Connection => RemoteError::Connection("connection reset by peer".to_string()),
            Failure::Timeout => RemoteError::Timeout(Duration::from_secs(30)),
        }
    }
}

#[derive(Default)]
pub struct FakeExecutor {
    commands: Mutex<Vec<String>>,
    inputs: Mutex<Vec<(String, Vec<u8>)>>,
    responses: Vec<(String, Output)>,
    failures: Mutex<Vec<(String, usize, Failure)>>,
    delays: Vec<(String, Duration)>,
    hook: Option<Hook>,
}

impl FakeExecutor {
    pub fn new() -> FakeExecutor {
        FakeExecutor::default()
    }

    /// Commands containing `needle` succeed with `stdout`
    pub fn respond(mut self, needle: &str, stdout: &str) -> FakeExecutor {
        let output = Output { stdout: stdout.to_string(), ..Output::default() };
        self.responses.push((needle.to_string(), output));
        self
    }

    /// Commands containing `needle` return `output` as-is
    pub fn respond_with(mut self, needle: &str, output: Output) -> FakeExecutor {
        self.responses.push((needle.to_string(), output));
        self
    }

    /// Commands containing `needle` fail with a connection error
    pub fn fail(self, needle: &str) -> FakeExecutor {
        self.fail_times(needle, usize::MAX)
    }

    /// Commands containing `needle` fail with a connection error the first `times` times
    pub fn fail_times(self, needle: &str, times: usize) -> FakeExecutor {
        self.push_failure(needle, times, Failure::Connection)
    }

    /// Commands containing `needle` hit their deadline the first `times` times
    pub fn time_out(self, needle: &str, times: usize) -> FakeExecutor {
        self.push_failure(needle, times, Failure::Timeout)
    }

    /// Commands containing `needle` take `delay` before answering
    pub fn delay(mut self, needle: &str, delay: Duration) -> FakeExecutor {
        self.delays.push((needle.to_string(), delay));
        self
    }

    /// Called with each command after it "ran"
    pub fn on_execute(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> FakeExecutor {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_containing(&self, needle: &str) -> Vec<String> {
        self.commands().into_iter().filter(|c| c.contains(needle)).collect()
    }

    pub fn inputs(&self) -> Vec<(String, Vec<u8>)> {
        self.inputs.lock().unwrap().clone()
    }

    fn push_failure(self, needle: &str, times: usize, failure: Failure) -> FakeExecutor {
        self.failures.lock().unwrap().push((needle.to_string(), times, failure));
        self
    }

    async fn run(&self, command: &str) -> Result<Output, RemoteError> {
        self.commands.lock().unwrap().push(command.to_string());

        let delay = self.delays.iter().find(|(needle, _)| command.contains(needle.as_str()));
        if let Some((_, delay)) = delay {
            tokio::time::sleep(*delay).await;
        }

        let failure = {
            let mut failures = self.failures.lock().unwrap();
            failures
                .iter_mut()
                .find(|(needle, n, _)| *n > 0 && command.contains(needle.as_str()))
                .map(|(_, remaining, failure)| {
                    *remaining -= 1;
                    *failure
                })
        };
        if let Some(failure) = failure {
            return Err(failure.error());
        }

        let output = self
            .responses
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();

        if let Some(hook) = &self.hook {
            hook(command);
        }
        Ok(output)
    }
}

#[async_trait]
impl RemoteExecutor for FakeExecutor {
    async fn execute(&self, command: &str, _timeout: Timeout) -> Result<Output, RemoteError> {
        self.run(command).await
    }

    async fn execute_with_input(
        &self,
        command: &str,
        input: Vec<u8>,
        _timeout: Timeout,
    ) -> Result<Output, RemoteError> {
        self.inputs.lock().unwrap().push((command.to_string(), input));
        self.run(command).await
    }
}
