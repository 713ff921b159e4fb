//! `JobScheduler`: owns the queue, fans out due jobs, and publishes run
//! records until cancelled.
//!
//! Lifecycle: `Idle` → `start` → `Running` → `cancel` → `Stopped`. An
//! instance is single-use; starting it a second time is a programming error
//! and panics.
//!
//! Shutdown is a drain: after cancellation no new run is launched, every
//! run already launched completes and delivers its record, and only then is
//! the result channel closed. A panicking failure policy is caught by the
//! run step and stops the job (failed and paused), so that run still
//! delivers. A panic anywhere else in a run-task (for example inside an
//! executor) ends that task without a record; the drain still completes.

use std::collections::HashSet;
use std::sync::Arc;

use cadence_core::SchedulerConfig;
use cadence_exec::ProcessExecutor;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::{queue::JobQueue, run::run_job, types::Job, types::RunRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
}

/// Drives scheduled jobs through the executor.
pub struct JobScheduler {
    config: SchedulerConfig,
    executor: Arc<dyn ProcessExecutor>,
    span: Span,
    state: State,
    cancel: Option<CancellationToken>,
    results: Option<mpsc::Receiver<RunRecord>>,
    main_task: Option<JoinHandle<()>>,
    /// Outstanding-run counter; gates closing the result channel.
    tracker: TaskTracker,
}

impl JobScheduler {
    pub fn new(config: SchedulerConfig, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            config,
            executor,
            span: info_span!("scheduler"),
            state: State::Idle,
            cancel: None,
            results: None,
            main_task: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Instrument the orchestration loop and every run with `span` instead
    /// of the default `scheduler` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Launch the orchestration loop in the background and return at once.
    ///
    /// Commands run through `shell`, or the configured `scheduler.shell`
    /// when `None`; a job's own shell wins over both. The loop stops when
    /// either `cancel` or [`JobScheduler::cancel`] fires. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// If this scheduler has already been started.
    pub fn start(
        &mut self,
        cancel: &CancellationToken,
        jobs: Vec<Arc<Job>>,
        shell: Option<&str>,
    ) {
        if self.state != State::Idle {
            panic!("JobScheduler already started");
        }
        self.state = State::Running;

        let cancel = cancel.child_token();
        self.cancel = Some(cancel.clone());

        let (tx, rx) = mpsc::channel(self.config.result_buffer.max(1));
        self.results = Some(rx);

        let mut queue = JobQueue::new();
        queue.set_jobs(Utc::now(), jobs);

        let run_loop = RunLoop {
            queue,
            cancel,
            tx,
            executor: Arc::clone(&self.executor),
            shell: shell.unwrap_or(&self.config.shell).to_string(),
            dry_run: self.config.dry_run,
            skip_overlapping: self.config.skip_overlapping,
            limiter: self
                .config
                .max_concurrent_runs
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tracker: self.tracker.clone(),
            span: self.span.clone(),
        };
        self.main_task = Some(tokio::spawn(run_loop.run().instrument(self.span.clone())));
    }

    /// Receiving end of the run-record stream. Available once, after `start`.
    ///
    /// The stream ends when the scheduler has fully drained.
    pub fn take_results(&mut self) -> Option<mpsc::Receiver<RunRecord>> {
        self.results.take()
    }

    /// Stop launching new runs. Does not wait for in-flight runs; use
    /// [`JobScheduler::wait`] for that. A no-op before `start`.
    pub fn cancel(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        if self.state == State::Running {
            self.state = State::Stopped;
        }
    }

    /// Wait until the loop and every run it launched have finished and the
    /// result channel is closed. Returns immediately if never started.
    pub async fn wait(&mut self) {
        if let Some(handle) = self.main_task.take() {
            if let Err(e) = handle.await {
                error!("scheduler loop terminated abnormally: {e}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running && self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }

    /// Runs launched but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}

/// State owned by the background orchestration task.
struct RunLoop {
    queue: JobQueue,
    cancel: CancellationToken,
    tx: mpsc::Sender<RunRecord>,
    executor: Arc<dyn ProcessExecutor>,
    shell: String,
    dry_run: bool,
    skip_overlapping: bool,
    limiter: Option<Arc<Semaphore>>,
    /// Names of jobs with a run currently outstanding.
    in_flight: Arc<Mutex<HashSet<String>>>,
    tracker: TaskTracker,
    span: Span,
}

impl RunLoop {
    async fn run(mut self) {
        info!(jobs = self.queue.len(), "scheduler started");

        while let Some(job) = self.queue.pop(&self.cancel, Utc::now()).await {
            if job.is_paused() {
                debug!(job = %job.name, "job paused, skipping");
                continue;
            }
            let guard = if self.skip_overlapping {
                match InFlightGuard::claim(&self.in_flight, &job.name) {
                    Some(guard) => Some(guard),
                    None => {
                        warn!(job = %job.name, "previous run still in flight, skipping");
                        continue;
                    }
                }
            } else {
                None
            };
            self.launch(job, guard);
        }

        info!(in_flight = self.tracker.len(), "cancelled, draining runs");
        self.tracker.close();
        self.tracker.wait().await;
        // Every run-task has sent its record; dropping the last sender
        // closes the stream for the consumer.
        drop(self.tx);
        info!("scheduler stopped");
    }

    fn launch(&self, job: Arc<Job>, guard: Option<InFlightGuard>) {
        info!(job = %job.name, user = %job.user, command = %job.command, "launching run");

        let executor = Arc::clone(&self.executor);
        let limiter = self.limiter.clone();
        let tx = self.tx.clone();
        let shell = self.shell.clone();
        let dry_run = self.dry_run;
        let span = info_span!(parent: &self.span, "job_run", job = %job.name);

        self.tracker.spawn(
            async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                let rec = run_job(executor.as_ref(), &job, &shell, dry_run).await;
                drop(guard);
                if tx.send(rec).await.is_err() {
                    warn!("result receiver dropped, run record discarded");
                }
            }
            .instrument(span),
        );
    }
}

/// Marks a job as running; releases the mark on drop, including on panic.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl InFlightGuard {
    fn claim(set: &Arc<Mutex<HashSet<String>>>, name: &str) -> Option<Self> {
        if !set.lock().insert(name.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            name: name.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.name);
    }
}
