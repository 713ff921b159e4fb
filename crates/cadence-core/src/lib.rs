//! `cadence-core`: configuration and shared error types for the cadence
//! job runner.

pub mod config;
pub mod error;

pub use config::{CadenceConfig, ExecConfig, SchedulerConfig};
pub use error::{CadenceError, Result};
