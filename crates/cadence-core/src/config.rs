use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_RESULT_BUFFER: usize = 256; // run records queued before producers wait
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024; // per stream

/// Top-level config (cadence.toml + CADENCE_* env overrides).
///
/// Nested keys use a double underscore in the environment, e.g.
/// `CADENCE_SCHEDULER__MAX_CONCURRENT_RUNS=8`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub exec: ExecConfig,
}

/// Knobs for the orchestration loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Shell used as `<shell> -c <command>` unless a job names its own.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Capacity of the run-record channel handed to the consumer.
    #[serde(default = "default_result_buffer")]
    pub result_buffer: usize,
    /// Upper bound on simultaneously executing runs. `None` = unbounded.
    #[serde(default)]
    pub max_concurrent_runs: Option<usize>,
    /// Skip a due job while its previous run is still in flight.
    #[serde(default = "bool_true")]
    pub skip_overlapping: bool,
    /// Execute commands but never touch job status or last-run time.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            result_buffer: DEFAULT_RESULT_BUFFER,
            max_concurrent_runs: None,
            skip_overlapping: true,
            dry_run: false,
        }
    }
}

/// Process execution limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Kill a run after this many seconds. `None` = wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Cap on captured stdout and on captured stderr, each.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}
fn default_result_buffer() -> usize {
    DEFAULT_RESULT_BUFFER
}
fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cadence/cadence.toml
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading config");

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::CadenceError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(CadenceConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CADENCE_").split("__"))
    }

    /// Validate cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.scheduler.shell.trim().is_empty() {
            return Err(crate::error::CadenceError::Config(
                "scheduler.shell must not be empty".to_string(),
            ));
        }
        if self.scheduler.result_buffer == 0 {
            return Err(crate::error::CadenceError::Config(
                "scheduler.result_buffer must be at least 1".to_string(),
            ));
        }
        if self.scheduler.max_concurrent_runs == Some(0) {
            return Err(crate::error::CadenceError::Config(
                "scheduler.max_concurrent_runs must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.toml", home)
}
