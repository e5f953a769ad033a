//! Logging configuration

use serde::{Deserialize, Serialize};

use super::EnvLookup;

const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter; `RUST_LOG` still wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(level) = env("JOINBENCH_LOG_LEVEL") {
            self.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            anyhow::bail!("unknown log level '{}', expected one of {:?}", self.level, LEVELS);
        }
        Ok(())
    }
}
