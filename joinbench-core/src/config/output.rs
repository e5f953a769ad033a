//! Report output configuration

use serde::{Deserialize, Serialize};

use super::EnvLookup;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `add-<clusters>-<threads>.json`
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: "./results".to_string() }
    }
}

impl OutputConfig {
    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(dir) = env("JOINBENCH_OUTPUT_DIR") {
            self.dir = dir;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dir.trim().is_empty() {
            anyhow::bail!("output dir must not be empty");
        }
        Ok(())
    }
}
