//! Experiment report
//!
//! The persisted JSON layout:
//!
//! ```text
//! {
//!   "start": <unix-micros>,
//!   "issue": <unix-micros>,
//!   "leader": {"addEnter": <unix-micros>, "addLeave": <unix-micros>, "leaderElect": <micros>} | null,
//!   "queries": [ {"start": <unix-micros>, "latency": <micros>}, ... ],
//!   "observes": [ {"observe": <unix-micros>, "queries": [ ... ]}, ... ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// Key under which the leader process stores its own measurement
pub const MEASUREMENT_KEY: &str = "measurement";

/// One completed write request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix microseconds at which the request was sent
    pub start: i64,
    /// Round-trip latency in microseconds
    pub latency: i64,
}

/// Measurement written by the leader process itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderMeasurement {
    #[serde(alias = "AddEnter")]
    pub add_enter: i64,
    #[serde(alias = "AddLeave")]
    pub add_leave: i64,
    #[serde(alias = "LeaderElect")]
    pub leader_elect: i64,
}

/// Load generated by the new leader of a secondary cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Unix microseconds at which the new leadership was observed
    pub observe: i64,
    pub queries: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub start: i64,
    pub issue: i64,
    /// `None` when the leader did not expose a usable measurement
    pub leader: Option<LeaderMeasurement>,
    pub queries: Vec<Sample>,
    pub observes: Vec<Observation>,
}

impl ExperimentReport {
    /// Report file name for a run shape
    pub fn file_name(clusters: usize, threads: usize) -> String {
        format!("add-{}-{}.json", clusters, threads)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Persist the report under `dir`, returning the written path.
    ///
    /// The file only appears once fully written.
    pub fn write_to(&self, dir: impl AsRef<Path>, clusters: usize, threads: usize) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(Self::file_name(clusters, threads));
        let data = self.to_json()?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of samples across primary load and observations
    pub fn total_samples(&self) -> usize {
        self.queries.len() + self.observes.iter().map(|o| o.queries.len()).sum::<usize>()
    }
}
