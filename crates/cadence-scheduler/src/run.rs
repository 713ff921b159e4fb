use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use cadence_exec::ProcessExecutor;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::types::{Job, JobState, JobStatus, RunId, RunRecord};

/// Execute `job` once and describe the outcome.
///
/// Runs `<shell> -c <command>` (the job's own shell wins over `shell`).
/// Unless `dry_run` is set, a completed run updates the job: success sets
/// `Good`, failure hands the job to its error handler, and either way
/// `last_run_time` becomes the run's start time. A run that could not be
/// launched leaves the job untouched and carries the error in the record.
///
/// Must not be called concurrently for the same job.
pub async fn run_job(
    executor: &dyn ProcessExecutor,
    job: &Arc<Job>,
    shell: &str,
    dry_run: bool,
) -> RunRecord {
    let run_time = Utc::now();
    let shell = job.shell.as_deref().unwrap_or(shell);
    debug!(job = %job.name, %shell, dry_run, "starting run");

    let mut rec = RunRecord {
        id: RunId::new(),
        job: Arc::clone(job),
        run_time,
        succeeded: None,
        new_status: JobStatus::Good,
        stdout: None,
        stderr: None,
        error: None,
    };

    let output = match executor.run(shell, &job.command).await {
        Ok(output) => output,
        Err(e) => {
            warn!(job = %job.name, user = %job.user, error = %e, "could not launch job");
            if !dry_run {
                rec.new_status = job.status();
            }
            rec.error = Some(e);
            return rec;
        }
    };

    rec.succeeded = Some(output.succeeded);
    rec.stdout = Some(output.stdout);
    rec.stderr = Some(output.stderr);

    if !dry_run {
        // The policy works on a copy so it may read the job without
        // re-entering the state lock.
        let mut next = job.state();
        if output.succeeded {
            next.status = JobStatus::Good;
            next.consecutive_failures = 0;
        } else {
            next.consecutive_failures += 1;
            apply_policy(job, &mut next);
        }
        next.last_run_time = Some(run_time);
        rec.new_status = next.status;
        *job.lock_state() = next;
    }

    info!(
        job = %job.name,
        succeeded = output.succeeded,
        exit_code = ?output.exit_code,
        status = %rec.new_status,
        "run finished"
    );
    rec
}

/// Run the job's failure policy. A panicking policy stops the job (failed
/// and paused) instead of tearing down the run-task, so the run still
/// reports.
fn apply_policy(job: &Job, state: &mut JobState) {
    let mut scratch = state.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        job.error_handler.apply(job, &mut scratch);
    }));
    match outcome {
        Ok(()) => *state = scratch,
        Err(_) => {
            error!(job = %job.name, "failure policy panicked, stopping job");
            state.status = JobStatus::Failed;
            job.set_paused(true);
        }
    }
}
