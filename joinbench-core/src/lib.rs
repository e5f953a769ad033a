//! Joinbench - Core
//!
//! A phase-synchronized harness that measures the latency disruption a
//! replicated cluster sees while an add-member reconfiguration is applied to its
//! leader.
//!
//! # Overview
//!
//! One run of the harness goes through these phases:
//!
//! 1. **Discovery** - every endpoint of every cluster is probed once to learn
//!    member ids and the current leader ([`topology`]).
//! 2. **Load** - `threads × clusters` workers write against the leader as soon
//!    as the `start` gate opens ([`worker`], [`gate`]).
//! 3. **Reconfiguration** - after the pre-delay the member ids of every
//!    secondary cluster are added through the leader and the `issued` gate
//!    opens ([`experiment`]).
//! 4. **Observation** - each secondary cluster endpoint polls its status until
//!    a new leader from its own cluster shows up; the new leader runs its own
//!    worker pool until `stop` ([`observer`]).
//! 5. **Aggregation** - every worker and observer is joined in spawn order and
//!    the [`report::ExperimentReport`] is assembled once.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use joinbench_core::config::BenchConfig;
//! use joinbench_core::experiment::Experiment;
//! use joinbench_core::http::HttpConnector;
//!
//! let config = BenchConfig::load()?;
//! let connector = Arc::new(HttpConnector::new(config.client.clone()));
//! let experiment = Experiment::new(connector, config.settings());
//! let (outcome, path) = experiment.execute(&config.clusters, &config.output.dir).await?;
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod experiment;
pub mod gate;
pub mod http;
pub mod observer;
pub mod report;
pub mod summary;
pub mod topology;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientError, Connector, MemberId, MemberStatus, StoreClient, NO_LEADER};
pub use experiment::{Experiment, ExperimentOutcome, ExperimentSettings};
pub use gate::{Gate, Phases};
pub use report::{ExperimentReport, LeaderMeasurement, Observation, Sample};
pub use topology::ClusterTopology;

/// Result type used across the harness
pub type Result<T> = std::result::Result<T, BenchError>;

/// Fatal conditions that abort a run.
///
/// Recoverable failures (a single write timing out, a status poll erroring)
/// never surface here; they are logged and the attempt is discarded.
#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("no clusters configured")]
    EmptyTopology,
    #[error("cluster {0} has no endpoints")]
    EmptyCluster(usize),
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: ClientError,
    },
    #[error("get status for endpoint {endpoint} failed: {source}")]
    Status {
        endpoint: String,
        #[source]
        source: ClientError,
    },
    #[error("leader not same: {first} and {second} (reported by {endpoint})")]
    LeaderConflict { first: MemberId, second: MemberId, endpoint: String },
    #[error("leader not found")]
    LeaderNotFound,
    #[error("reconfiguration on {endpoint} failed: {source}")]
    Reconfigure {
        endpoint: String,
        #[source]
        source: ClientError,
    },
    #[error("leader measurement unavailable: {0}")]
    Measurement(String),
    #[error("task failed: {0}")]
    TaskFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for BenchError {
    fn from(err: tokio::task::JoinError) -> Self {
        BenchError::TaskFailed(err.to_string())
    }
}
