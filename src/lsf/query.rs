use crate::remote::quote::quote;

/// Scheduler commands that don't submit anything
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// `bjobs`: the user's pending and running jobs
    Queue,
    /// `bstat`: resource usage of the given jobs, or of all jobs
    Stats(Vec<String>),
    /// `showstart`: estimated start time of one job
    StartTime(String),
    /// `bkill`: remove jobs from the queue
    Kill(Vec<String>),
}

impl SchedulerCommand {
    pub fn render(&self) -> String {
        match self {
            SchedulerCommand::Queue => "bjobs".to_string(),
            SchedulerCommand::Stats(ids) => with_ids("bstat", ids),
            SchedulerCommand::StartTime(id) => format!("showstart {}", quote(id)),
            SchedulerCommand::Kill(ids) => with_ids("bkill", ids),
        }
    }
}

fn with_ids(program: &str, ids: &[String]) -> String {
    ids.iter().fold(program.to_string(), |mut command, id| {
        command.push(' ');
        command.push_str(&quote(id));
        command
    })
}
