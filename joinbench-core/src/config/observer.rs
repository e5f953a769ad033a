//! Leader polling configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::EnvLookup;
use crate::observer::Backoff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub backoff_initial_ms: u64,
    /// Upper bound between status polls, and so on how late a new leader can
    /// be stamped after it actually took over
    pub backoff_max_ms: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self { backoff_initial_ms: 10, backoff_max_ms: 50 }
    }
}

impl ObserverConfig {
    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(ms) = env("JOINBENCH_BACKOFF_INITIAL_MS").and_then(|v| v.parse().ok()) {
            self.backoff_initial_ms = ms;
        }
        if let Some(ms) = env("JOINBENCH_BACKOFF_MAX_MS").and_then(|v| v.parse().ok()) {
            self.backoff_max_ms = ms;
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.backoff_initial_ms),
            max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backoff_initial_ms == 0 {
            anyhow::bail!("observer backoff_initial_ms must be greater than zero");
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            anyhow::bail!("observer backoff_initial_ms must not exceed backoff_max_ms");
        }
        Ok(())
    }
}
