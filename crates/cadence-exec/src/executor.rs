//! `ProcessExecutor`: the seam between the scheduler and the operating
//! system.
//!
//! The scheduler is written against the trait so tests can substitute an
//! in-memory executor; production code uses [`ShellExecutor`].

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::ExecConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::{ExecError, Result},
    truncate,
    types::ExecOutput,
};

/// Runs `<shell> -c <command>` to completion.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Execute `command` through `shell`.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures (spawn, wait) are errors. A non-zero
    /// exit is reported as `Ok` with `succeeded == false`.
    async fn run(&self, shell: &str, command: &str) -> Result<ExecOutput>;
}

/// Spawns real child processes via `tokio::process`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Option<Duration>,
    max_output_bytes: usize,
}

impl ShellExecutor {
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            timeout: config.timeout_secs.map(Duration::from_secs),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(&ExecConfig::default())
    }
}

#[async_trait]
impl ProcessExecutor for ShellExecutor {
    async fn run(&self, shell: &str, command: &str) -> Result<ExecOutput> {
        debug!(%shell, %command, "spawning");

        // kill_on_drop: when the timeout future wins, dropping the wait
        // future drops the child and the runtime reaps it with SIGKILL.
        let child = Command::new(shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                shell: shell.to_string(),
                reason: e.to_string(),
            })?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            None => wait.await?,
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output?,
                Err(_elapsed) => {
                    warn!(%command, secs = limit.as_secs(), "run exceeded timeout, killed");
                    return Ok(ExecOutput {
                        succeeded: false,
                        exit_code: None,
                        stdout: Vec::new(),
                        stderr: format!("[killed after {}s timeout]\n", limit.as_secs())
                            .into_bytes(),
                        timed_out: true,
                    });
                }
            },
        };

        Ok(ExecOutput {
            succeeded: output.status.success(),
            exit_code: output.status.code(),
            stdout: truncate::truncate_output(output.stdout, self.max_output_bytes),
            stderr: truncate::truncate_output(output.stderr, self.max_output_bytes),
            timed_out: false,
        })
    }
}
