//! Experiment timing configuration

use serde::{Deserialize, Serialize};

use super::EnvLookup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Requesters per cluster against the leader
    pub threads: usize,
    /// Seconds of load before the reconfiguration
    pub before_secs: u64,
    /// Seconds of load after the reconfiguration returned
    pub after_secs: u64,
    pub request_timeout_secs: u64,
    pub reconfigure_timeout_secs: u64,
    pub strict_measurement: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            before_secs: 5,
            after_secs: 5,
            request_timeout_secs: 300,
            reconfigure_timeout_secs: 300,
            strict_measurement: false,
        }
    }
}

impl ExperimentConfig {
    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(threads) = env("JOINBENCH_THREADS").and_then(|v| v.parse().ok()) {
            self.threads = threads;
        }
        if let Some(secs) = env("JOINBENCH_BEFORE_SECS").and_then(|v| v.parse().ok()) {
            self.before_secs = secs;
        }
        if let Some(secs) = env("JOINBENCH_AFTER_SECS").and_then(|v| v.parse().ok()) {
            self.after_secs = secs;
        }
        if let Some(secs) = env("JOINBENCH_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = env("JOINBENCH_RECONFIGURE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.reconfigure_timeout_secs = secs;
        }
        if let Some(strict) = env("JOINBENCH_STRICT_MEASUREMENT") {
            self.strict_measurement = strict.parse().unwrap_or(false);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.threads == 0 {
            anyhow::bail!("experiment threads must be at least 1");
        }
        if self.request_timeout_secs == 0 || self.reconfigure_timeout_secs == 0 {
            anyhow::bail!("experiment timeouts must be greater than zero");
        }
        Ok(())
    }
}
