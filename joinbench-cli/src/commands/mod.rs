pub mod discover;
pub mod run;

use anyhow::{Context, Result};
use clap::Args;
use env_logger::Env;
use std::path::{Path, PathBuf};

use joinbench_core::config::{parse_cluster, BenchConfig, LoggingConfig, DEFAULT_CONFIG_FILE};

#[derive(Args, Debug, Default)]
pub struct ClusterArgs {
    /// One cluster as comma-separated endpoints; repeat once per cluster
    #[arg(long = "cluster", value_name = "EP,EP,...")]
    pub clusters: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub clusters: ClusterArgs,

    /// Requesters per cluster
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seconds of load before the reconfiguration
    #[arg(long, value_name = "SECS")]
    pub before: Option<u64>,

    /// Seconds of load after the reconfiguration
    #[arg(long, value_name = "SECS")]
    pub after: Option<u64>,

    /// Report directory
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Fail when the leader measurement is missing or malformed
    #[arg(long)]
    pub strict_measurement: bool,
}

impl ClusterArgs {
    fn apply(&self, config: &mut BenchConfig) {
        if !self.clusters.is_empty() {
            config.clusters = self.clusters.iter().map(|c| parse_cluster(c)).collect();
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut BenchConfig) {
        self.clusters.apply(config);
        if let Some(threads) = self.threads {
            config.experiment.threads = threads;
        }
        if let Some(before) = self.before {
            config.experiment.before_secs = before;
        }
        if let Some(after) = self.after {
            config.experiment.after_secs = after;
        }
        if let Some(output) = &self.output {
            config.output.dir = output.display().to_string();
        }
        if self.strict_measurement {
            config.experiment.strict_measurement = true;
        }
    }
}

/// Defaults, then file, then env; flags are applied by the caller.
fn load_config(path: Option<&Path>) -> Result<BenchConfig> {
    match path {
        Some(path) => {
            let mut config = BenchConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_vars();
            Ok(config)
        }
        None => BenchConfig::load_from(DEFAULT_CONFIG_FILE),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(logging.level.as_str()))
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init();
}
