//! Error types for the cadence-exec crate.

use thiserror::Error;

/// Infrastructure failures: the command never got a fair chance to run.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The shell binary could not be spawned (missing, not executable, ...).
    #[error("failed to spawn {shell}: {reason}")]
    Spawn { shell: String, reason: String },

    /// Waiting on the child or reading its pipes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ExecError>;
