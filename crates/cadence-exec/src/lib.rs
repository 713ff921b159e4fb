//! cadence-exec: runs job commands as child processes.
//!
//! The scheduler only sees the [`ProcessExecutor`] trait. [`ShellExecutor`]
//! is the production implementation: it spawns `<shell> -c <command>` through
//! `tokio::process`, captures stdout/stderr, and optionally kills runs that
//! exceed a time budget.
//!
//! A command that runs and exits non-zero is *not* an error here; it comes
//! back as `Ok(ExecOutput { succeeded: false, .. })`. `Err` is reserved for
//! failures to launch or supervise the process at all.

pub mod error;
pub mod executor;
pub mod truncate;
pub mod types;

pub use error::{ExecError, Result};
pub use executor::{ProcessExecutor, ShellExecutor};
pub use types::ExecOutput;
