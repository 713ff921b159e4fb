//! Shared data types for cadence-exec.

use serde::{Deserialize, Serialize};

/// Outcome of a process that was launched and ran to completion (or was
/// killed for exceeding its time budget).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    /// `true` iff the process exited with status 0.
    pub succeeded: bool,

    /// Exit code, when the process exited normally.
    ///
    /// `None` when it was terminated by a signal or killed on timeout.
    pub exit_code: Option<i32>,

    /// Captured standard output, possibly truncated.
    pub stdout: Vec<u8>,

    /// Captured standard error, possibly truncated.
    pub stderr: Vec<u8>,

    /// Set when the run was killed because it exceeded its timeout.
    pub timed_out: bool,
}

impl ExecOutput {
    /// Convenience constructor for a clean exit with the given code.
    pub fn exited(exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            succeeded: exit_code == 0,
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }
}
