use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
///
/// Run-level failures are not represented here; they travel inside
/// [`crate::RunRecord`] so one bad job never stops the loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The provided schedule definition is invalid or unsupported.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
