#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadence_exec::{ExecError, ExecOutput, ProcessExecutor};
use cadence_scheduler::{Job, Schedule};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// In-memory executor keyed on the command text:
///
/// - `fail`    → exits 1 with "boom" on stderr
/// - `missing` → spawn error
/// - anything else → exits 0 echoing the command
#[derive(Debug, Default)]
pub struct FakeExecutor {
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<(String, String)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every run blocks until the test adds a permit to `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// `(shell, command)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessExecutor for FakeExecutor {
    async fn run(&self, shell: &str, command: &str) -> cadence_exec::Result<ExecOutput> {
        self.calls
            .lock()
            .push((shell.to_string(), command.to_string()));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match command {
            "fail" => Ok(ExecOutput::exited(1, "", "boom")),
            "missing" => Err(ExecError::Spawn {
                shell: shell.to_string(),
                reason: "No such file or directory".to_string(),
            }),
            other => Ok(ExecOutput::exited(0, format!("ran {other}"), "")),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A job that fires once, `millis` from now.
pub fn once_in(name: &str, command: &str, millis: i64) -> Arc<Job> {
    let at = chrono::Utc::now() + chrono::Duration::milliseconds(millis);
    Arc::new(Job::new(name, command, Schedule::Once { at }))
}

pub fn every(name: &str, command: &str, secs: u64) -> Arc<Job> {
    Arc::new(Job::new(name, command, Schedule::Interval { every_secs: secs }))
}
