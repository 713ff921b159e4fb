use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadence_exec::ExecError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::policy::{FailurePolicy, StopPolicy};

/// Defines when and how often a job should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run exactly once at the given UTC instant.
    Once { at: DateTime<Utc> },

    /// Run repeatedly with a fixed interval in seconds.
    Interval { every_secs: u64 },

    /// Run every day at the given hour and minute (UTC).
    Daily { hour: u8, minute: u8 },

    /// Run on a specific weekday (0 = Monday … 6 = Sunday) at the given time (UTC).
    Weekly { day: u8, hour: u8, minute: u8 },

    /// Run according to a cron expression with a leading seconds field,
    /// e.g. `0 */5 * * * *`.
    Cron { expression: String },
}

/// Health of a job as of its last completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Last run succeeded, or the job has never run.
    #[default]
    Good,
    /// Recent runs failed; the failure policy is still retrying.
    Backoff,
    /// The failure policy gave up on this job.
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Good => "good",
            JobStatus::Backoff => "backoff",
            JobStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "good" => Ok(JobStatus::Good),
            "backoff" => Ok(JobStatus::Backoff),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Mutable run bookkeeping for a job. Written only by the run step and the
/// job's failure policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    pub status: JobStatus,
    /// Start time of the most recent completed run.
    pub last_run_time: Option<DateTime<Utc>>,
    /// Failed runs since the last success.
    pub consecutive_failures: u32,
}

/// A schedulable unit of work.
///
/// Jobs are shared as `Arc<Job>` between the queue, the orchestration loop
/// and at most one in-flight run. Identity and schedule are immutable;
/// `paused` may be flipped from anywhere at any time; [`JobState`] sits
/// behind a mutex.
#[derive(Debug)]
pub struct Job {
    /// Unique name within one scheduler instance.
    pub name: String,
    /// Shell command line, run as `<shell> -c <command>`.
    pub command: String,
    /// Owner the job belongs to, carried for logging and reporting.
    pub user: String,
    /// Overrides the scheduler's shell when set.
    pub shell: Option<String>,
    pub schedule: Schedule,
    /// Applied after every failed run.
    pub error_handler: Arc<dyn FailurePolicy>,
    paused: AtomicBool,
    state: Mutex<JobState>,
}

impl Job {
    /// Create a job with the [`StopPolicy`] error handler, owned by the
    /// current `$USER`.
    pub fn new(name: impl Into<String>, command: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            user: std::env::var("USER").unwrap_or_default(),
            shell: None,
            schedule,
            error_handler: Arc::new(StopPolicy),
            paused: AtomicBool::new(false),
            state: Mutex::new(JobState::default()),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn FailurePolicy>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn with_paused(self, paused: bool) -> Self {
        self.paused.store(paused, Ordering::Relaxed);
        self
    }

    /// Seed state, e.g. when restoring from persisted history.
    pub fn with_state(self, state: JobState) -> Self {
        *self.state.lock() = state;
        self
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause or resume. Safe while the job sits in a running queue; its
    /// position in the schedule does not change.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Snapshot of the job's run bookkeeping.
    pub fn state(&self) -> JobState {
        self.state.lock().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status
    }

    pub fn last_run_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_run_time
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock()
    }
}

/// Identifier of a single run (UUIDv7, so records sort by creation time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one execution attempt. Built once by the run step and handed
/// to the consumer through the scheduler's result channel.
#[derive(Debug)]
pub struct RunRecord {
    pub id: RunId,
    pub job: Arc<Job>,
    /// When the run started.
    pub run_time: DateTime<Utc>,
    /// Process outcome. `None` when the process could not be launched.
    pub succeeded: Option<bool>,
    /// Job status as of run completion.
    pub new_status: JobStatus,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
    /// Infrastructure failure, distinct from a non-zero exit.
    pub error: Option<ExecError>,
}

impl RunRecord {
    pub fn is_infrastructure_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn stdout_lossy(&self) -> String {
        lossy(self.stdout.as_deref())
    }

    pub fn stderr_lossy(&self) -> String {
        lossy(self.stderr.as_deref())
    }
}

fn lossy(bytes: Option<&[u8]>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}
