//! `cadence-scheduler`: the execution core of a cron-like job runner.
//!
//! # Overview
//!
//! A [`JobScheduler`] is handed a fixed list of [`Job`]s. Its background loop
//! pops the next due job from a [`JobQueue`], launches [`run_job`] for it as
//! a concurrent task, and delivers one [`RunRecord`] per run on a channel.
//! Cancellation stops new launches; in-flight runs always finish and report
//! before the channel closes.
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                          |
//! |------------|----------------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant             |
//! | `Interval` | Repeat every N seconds                             |
//! | `Daily`    | Fire at HH:MM UTC every day                        |
//! | `Weekly`   | Fire at HH:MM UTC on a specific weekday            |
//! | `Cron`     | Cron expression with a seconds field               |
//!
//! # Failure handling
//!
//! A run whose process exits non-zero is passed to the job's
//! [`FailurePolicy`]. A run whose process cannot be launched at all leaves
//! the job untouched and carries the error in [`RunRecord::error`].

pub mod engine;
pub mod error;
pub mod policy;
pub mod queue;
pub mod run;
pub mod schedule;
pub mod types;

pub use engine::JobScheduler;
pub use error::{Result, SchedulerError};
pub use policy::{BackoffPolicy, ContinuePolicy, FailurePolicy, StopPolicy};
pub use queue::JobQueue;
pub use run::run_job;
pub use schedule::next_after;
pub use types::{Job, JobState, JobStatus, RunId, RunRecord, Schedule};
