use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use log::{info, warn};

use crate::cmd::context::{AssumeYes, Confirm, Context, Prompt, Session};
use crate::cmd::history::format_history;
use crate::config::{find_project_root, CliConfig};
use crate::docker::ComposeAction;
use crate::db::open::HistoryStore;
use crate::db::submission::load::{HistoryQuery, DEFAULT_LIMIT};
use crate::remote::ssh::SshExecutor;
use crate::vcs::{Git, VersionControl};

mod cmd;
mod config;
mod db;
mod docker;
mod error;
mod lsf;
mod remote;
mod resolve;
mod sync;
mod vcs;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sync a project to an LSF cluster and keep track of what was submitted",
    long_about = None
)]
struct Args {
    /// Branch to record submissions under (default: the active git branch)
    #[arg(long, global = true)]
    branch: Option<String>,
    /// Submission profile from the config file
    #[arg(long, global = true)]
    profile: Option<String>,
    /// Don't ask for confirmation
    #[arg(short, long, global = true)]
    yes: bool,
    /// Use the remote tree as-is
    #[arg(long, global = true)]
    no_sync: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push the project tree to the cluster
    Sync,
    /// Sync, then run the configured install commands remotely
    Install,
    /// Sync, then submit a job script
    Submit {
        script: String,
        /// Submit as N chained parts, each waiting for the previous one to end
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        split: u32,
    },
    /// Submit the script of an earlier submission again (default: the latest)
    Resubmit { job_id: Option<String> },
    /// Kill a job and every split part of its submission
    Remove { job_id: String },
    /// Show recorded submissions, filtered by --branch and --profile
    History {
        /// Only submissions at or after this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,
        /// Only submissions at or before this time (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_time)]
        until: Option<DateTime<Utc>>,
        /// Most recent submissions to show, 0 for all
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// The user's pending and running jobs
    Queue,
    /// Resource usage of a submission, or of all jobs
    Stats { job_id: Option<String> },
    /// Estimated start time of a submission
    StartTime { job_id: String },
    /// Build or start the project's containers with docker compose
    Docker {
        #[command(subcommand)]
        action: DockerAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum DockerAction {
    /// docker compose build
    Build,
    /// docker compose up -d
    Up,
}

impl From<DockerAction> for ComposeAction {
    fn from(action: DockerAction) -> ComposeAction {
        match action {
            DockerAction::Build => ComposeAction::Build,
            DockerAction::Up => ComposeAction::Up,
        }
    }
}

/// Exit status of a process ended by SIGINT
static INTERRUPTED: i32 = 130;

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| Utc.from_utc_datetime(&time))
        .ok_or_else(|| format!("'{value}' is neither an RFC 3339 time nor a YYYY-MM-DD date"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let project_root = find_project_root(&cwd).unwrap_or(cwd);
    info!("Project root: {}", project_root.display());
    let config = CliConfig::load(&project_root)?;

    let vcs: Box<dyn VersionControl> = Box::new(Git);
    let confirm: Box<dyn Confirm> = if args.yes { Box::new(AssumeYes) } else { Box::new(Prompt) };
    let store = HistoryStore::open(&config.history_path(&project_root))?;
    let executor = Arc::new(SshExecutor::new(&config.ssh));
    let branch = args.branch.clone();
    let ctx = Context::new(project_root, config, branch, args.profile.clone(), args.no_sync);

    let mut session = Session::new(ctx, executor, vcs, confirm, store);
    let cancel = session.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, finishing operations already in flight. Press Ctrl-C again to abort");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Aborted");
            std::process::exit(INTERRUPTED);
        }
    });

    match args.command {
        Command::Sync => match session.sync().await? {
            Some(result) => println!("{}", result.summary()),
            None => println!("Sync is disabled"),
        },
        Command::Install => print!("{}", session.install().await?.stdout),
        Command::Submit { script, split } => {
            report(session.submit(&script, split as usize).await?)
        }
        Command::Resubmit { job_id } => report(session.resubmit(job_id.as_deref()).await?),
        Command::Remove { job_id } => {
            if let Some(removal) = session.remove(&job_id).await? {
                print!("{}", removal.output.stdout);
                println!("Removed job(s) {}", removal.job_ids.join(", "));
            }
        }
        Command::History { since, until, limit } => {
            let query =
                HistoryQuery { branch: args.branch, profile: args.profile, since, until, limit };
            print!("{}", format_history(&session.history(&query)?));
        }
        Command::Queue => print!("{}", session.queue().await?.stdout),
        Command::Stats { job_id } => print!("{}", session.stats(job_id.as_deref()).await?.stdout),
        Command::StartTime { job_id } => {
            for (id, output) in session.start_time(&job_id).await? {
                println!("{id}: {}", output.stdout.trim());
            }
        }
        Command::Docker { action } => session.docker(action.into()).await?,
    }
    Ok(())
}

fn report(record: Option<db::submission::SubmissionRecord>) {
    match record {
        Some(record) => println!(
            "Submitted job(s) {} from {}",
            record.scheduler_job_ids.join(", "),
            record.job_script_path
        ),
        None => println!("Nothing was submitted"),
    }
}
