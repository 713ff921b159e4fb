//! Failure policies decide a job's status after a failed run.
//!
//! A policy is invoked synchronously by the run step on a copy of the job's
//! state, which is written back once `apply` returns. It is the only writer
//! of `status` on the failure path and may freely read the job (including
//! `job.state()`), which still shows the previous run.
//! `consecutive_failures` in the copy has already been incremented for the
//! run being handled.

use std::fmt;

use tracing::{info, warn};

use crate::types::{Job, JobState, JobStatus};

pub trait FailurePolicy: fmt::Debug + Send + Sync {
    /// Update `state` (and optionally the job's pause flag) after a failed run.
    fn apply(&self, job: &Job, state: &mut JobState);
}

/// Give up immediately: mark the job failed and pause it.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopPolicy;

impl FailurePolicy for StopPolicy {
    fn apply(&self, job: &Job, state: &mut JobState) {
        state.status = JobStatus::Failed;
        job.set_paused(true);
        warn!(job = %job.name, user = %job.user, "job failed, stopping it");
    }
}

/// Ignore the failure; the job stays healthy and keeps its schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuePolicy;

impl FailurePolicy for ContinuePolicy {
    fn apply(&self, job: &Job, state: &mut JobState) {
        state.status = JobStatus::Good;
        info!(job = %job.name, failures = state.consecutive_failures, "job failed, continuing");
    }
}

/// Tolerate up to `max_retries` consecutive failures in `Backoff`, then stop.
///
/// Retries keep the job's regular schedule; `Backoff` is a status label, the
/// next run is not delayed.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl FailurePolicy for BackoffPolicy {
    fn apply(&self, job: &Job, state: &mut JobState) {
        if state.consecutive_failures > self.max_retries {
            state.status = JobStatus::Failed;
            job.set_paused(true);
            warn!(
                job = %job.name,
                failures = state.consecutive_failures,
                "retries exhausted, stopping job"
            );
        } else {
            state.status = JobStatus::Backoff;
            info!(
                job = %job.name,
                failures = state.consecutive_failures,
                max_retries = self.max_retries,
                "job failed, backing off"
            );
        }
    }
}
