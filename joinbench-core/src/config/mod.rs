//! Configuration system for Joinbench
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (CLI flags applied by the caller) - Highest priority
//! 2. **Environment Variables** (`JOINBENCH_*`) - Override file config
//! 3. **Config File** (joinbench.toml) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example file
//!
//! ```toml
//! clusters = [
//!     ["http://10.0.0.1:7000", "http://10.0.0.2:7000", "http://10.0.0.3:7000"],
//!     ["http://10.0.1.1:7000", "http://10.0.1.2:7000", "http://10.0.1.3:7000"],
//! ]
//!
//! [experiment]
//! threads = 4
//! before_secs = 10
//! after_secs = 20
//!
//! [client]
//! auth_token = "secret"
//! ```

pub mod client;
pub mod experiment;
pub mod logging;
pub mod observer;
pub mod output;

pub use client::ClientConfig;
pub use experiment::ExperimentConfig;
pub use logging::LoggingConfig;
pub use observer::ObserverConfig;
pub use output::OutputConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::experiment::ExperimentSettings;

/// Default config file looked up by [`BenchConfig::load`]
pub const DEFAULT_CONFIG_FILE: &str = "joinbench.toml";

pub(crate) type EnvLookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// Complete Joinbench configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Endpoints grouped by cluster
    pub clusters: Vec<Vec<String>>,
    pub experiment: ExperimentConfig,
    pub client: ClientConfig,
    pub observer: ObserverConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration with full supersedence chain
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (joinbench.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file; a missing file means defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.apply_env(&|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_env(&mut self, env: &EnvLookup<'_>) {
        if let Some(clusters) = env("JOINBENCH_CLUSTERS") {
            self.clusters = parse_clusters(&clusters);
        }
        self.experiment.apply_env(env);
        self.client.apply_env(env);
        self.observer.apply_env(env);
        self.output.apply_env(env);
        self.logging.apply_env(env);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.clusters.is_empty() {
            anyhow::bail!("no clusters configured");
        }
        let mut seen = HashSet::new();
        for (idx, cluster) in self.clusters.iter().enumerate() {
            if cluster.is_empty() {
                anyhow::bail!("cluster {} has no endpoints", idx);
            }
            for endpoint in cluster {
                if !seen.insert(endpoint.as_str()) {
                    anyhow::bail!("endpoint {} is configured more than once", endpoint);
                }
            }
        }

        self.experiment.validate()?;
        self.client.validate()?;
        self.observer.validate()?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Experiment knobs in their runtime form
    pub fn settings(&self) -> ExperimentSettings {
        ExperimentSettings {
            threads: self.experiment.threads,
            before: Duration::from_secs(self.experiment.before_secs),
            after: Duration::from_secs(self.experiment.after_secs),
            request_timeout: Duration::from_secs(self.experiment.request_timeout_secs),
            reconfigure_timeout: Duration::from_secs(self.experiment.reconfigure_timeout_secs),
            backoff: self.observer.backoff(),
            strict_measurement: self.experiment.strict_measurement,
        }
    }
}

/// Parse one cluster given as comma-separated endpoints
pub fn parse_cluster(spec: &str) -> Vec<String> {
    spec.split(',').map(str::trim).filter(|ep| !ep.is_empty()).map(String::from).collect()
}

/// Parse clusters separated by `;`, each a comma-separated endpoint list
pub fn parse_clusters(spec: &str) -> Vec<Vec<String>> {
    spec.split(';').map(parse_cluster).filter(|cluster| !cluster.is_empty()).collect()
}
