//! Experiment orchestration
//!
//! Spawns the primary worker pool and the observers, drives the phase gates
//! through the reconfiguration and collects every task in spawn order before
//! assembling the report.

use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::client::{ClientError, Connector, MemberId, StoreClient};
use crate::clock::Timebase;
use crate::gate::Phases;
use crate::observer::{observe, Backoff, ObservationEvent, ObserverSpec};
use crate::report::{ExperimentReport, LeaderMeasurement, Sample, MEASUREMENT_KEY};
use crate::topology::{self, ClusterTopology};
use crate::worker::{run_worker, WorkerResult, WorkerSpec, WorkerStats};
use crate::{BenchError, Result};

/// Knobs of one experiment run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSettings {
    /// Workers per cluster on the leader, and sub-pool size on a new leader
    pub threads: usize,
    /// Load before the reconfiguration is issued
    pub before: Duration,
    /// Load after the reconfiguration returned
    pub after: Duration,
    pub request_timeout: Duration,
    pub reconfigure_timeout: Duration,
    pub backoff: Backoff,
    /// Fail the run when the leader measurement cannot be read
    pub strict_measurement: bool,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        Self {
            threads: 1,
            before: Duration::from_secs(5),
            after: Duration::from_secs(5),
            request_timeout: Duration::from_secs(300),
            reconfigure_timeout: Duration::from_secs(300),
            backoff: Backoff::default(),
            strict_measurement: false,
        }
    }
}

/// A secondary cluster whose new leader was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedLeader {
    pub cluster_index: usize,
    pub endpoint: String,
    pub leader_id: MemberId,
    pub workers: Vec<WorkerStats>,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub report: ExperimentReport,
    /// Primary workers in spawn order; their samples make up `report.queries` in the same order
    pub workers: Vec<WorkerStats>,
    /// One entry per element of `report.observes`
    pub observed: Vec<ObservedLeader>,
}

impl ExperimentOutcome {
    /// Attempts and failures across every worker of the run
    pub fn attempt_totals(&self) -> (u64, u64) {
        self.workers
            .iter()
            .chain(self.observed.iter().flat_map(|o| o.workers.iter()))
            .fold((0, 0), |(attempts, failures), w| (attempts + w.attempts, failures + w.failures))
    }
}

pub struct Experiment {
    connector: Arc<dyn Connector>,
    settings: ExperimentSettings,
}

impl Experiment {
    pub fn new(connector: Arc<dyn Connector>, settings: ExperimentSettings) -> Self {
        Self { connector, settings }
    }

    pub async fn discover(&self, clusters: &[Vec<String>]) -> Result<ClusterTopology> {
        topology::discover(&*self.connector, clusters).await
    }

    /// Discover, run and persist the report under `output_dir`.
    ///
    /// Nothing is written unless the whole run succeeded.
    pub async fn execute(
        &self,
        clusters: &[Vec<String>],
        output_dir: impl AsRef<Path>,
    ) -> Result<(ExperimentOutcome, PathBuf)> {
        let topology = Arc::new(self.discover(clusters).await?);
        let outcome = self.run(topology.clone()).await?;
        let path =
            outcome.report.write_to(output_dir, topology.clusters.len(), self.settings.threads)?;
        info!("report written to {}", path.display());
        Ok((outcome, path))
    }

    /// Run the phases against an already discovered topology.
    pub async fn run(&self, topology: Arc<ClusterTopology>) -> Result<ExperimentOutcome> {
        let settings = &self.settings;
        let leader_endpoint = topology.leader_endpoint.clone();

        let leader = self.connect(&leader_endpoint).await?;
        let admin = self.connect(&leader_endpoint).await?;

        let timebase = Timebase::now();
        let phases = Phases::new();

        let primary_count = settings.threads * topology.clusters.len();
        let mut workers = Vec::with_capacity(primary_count);
        for id in 0..primary_count {
            workers.push(tokio::spawn(run_worker(
                leader.clone(),
                WorkerSpec::primary(id, settings.request_timeout),
                Some(phases.start.clone()),
                phases.stop.clone(),
                timebase,
            )));
        }
        drop(leader);

        let mut observers = Vec::new();
        for (cluster_index, cluster) in topology.secondary_clusters() {
            for endpoint in &cluster.endpoints {
                let spec = ObserverSpec {
                    cluster_index,
                    endpoint: endpoint.endpoint.clone(),
                    old_leader: topology.leader_id,
                    members: cluster.members.clone(),
                    threads: settings.threads,
                    request_timeout: settings.request_timeout,
                    backoff: settings.backoff,
                };
                observers.push(tokio::spawn(observe(
                    self.connector.clone(),
                    spec,
                    phases.clone(),
                    timebase,
                )));
            }
        }
        info!(
            "spawned {} requesters and {} observers",
            workers.len(),
            observers.len()
        );

        let issued = self.issue(&*admin, &topology.members_to_add(), &phases, timebase).await;
        drop(admin);

        // Every task is drained before any error surfaces.
        let collected = collect(workers, observers).await;
        let (start, issue) = issued?;
        let (results, events) = collected?;

        let leader_measurement = self.read_measurement(&leader_endpoint).await?;

        let mut queries: Vec<Sample> = Vec::new();
        let mut worker_stats = Vec::with_capacity(results.len());
        for result in results {
            worker_stats.push(result.stats());
            queries.extend(result.samples);
        }

        let mut observes = Vec::with_capacity(events.len());
        let mut observed = Vec::with_capacity(events.len());
        for event in events {
            observed.push(ObservedLeader {
                cluster_index: event.cluster_index,
                endpoint: event.endpoint.clone(),
                leader_id: event.leader_id,
                workers: event.workers.clone(),
            });
            observes.push(event.into_observation());
        }

        let report =
            ExperimentReport { start, issue, leader: leader_measurement, queries, observes };
        info!(
            "experiment finished: {} primary samples, {} observed clusters",
            report.queries.len(),
            report.observes.len()
        );

        Ok(ExperimentOutcome { report, workers: worker_stats, observed })
    }

    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn StoreClient>> {
        self.connector
            .connect(endpoint)
            .await
            .map_err(|source| BenchError::Connect { endpoint: endpoint.to_string(), source })
    }

    /// Open `start`, wait, reconfigure, open `issued`, wait, open `stop`.
    ///
    /// Returns the experiment start and issue timestamps. `stop` is open
    /// whenever this returns.
    async fn issue(
        &self,
        admin: &dyn StoreClient,
        add_members: &[MemberId],
        phases: &Phases,
        timebase: Timebase,
    ) -> Result<(i64, i64)> {
        let settings = &self.settings;

        let start = timebase.now_micros();
        phases.start.open();
        sleep(settings.before).await;

        let issue = timebase.now_micros();
        info!("adding members {:?} through {}", add_members, admin.endpoint());
        let result = match timeout(
            settings.reconfigure_timeout,
            admin.reconfigure(add_members, settings.reconfigure_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        };

        if let Err(source) = result {
            phases.stop.open();
            return Err(BenchError::Reconfigure { endpoint: admin.endpoint().to_string(), source });
        }

        phases.issued.open();
        sleep(settings.after).await;
        phases.stop.open();

        Ok((start, issue))
    }

    /// Read the leader's own measurement through a short-lived connection.
    async fn read_measurement(&self, endpoint: &str) -> Result<Option<LeaderMeasurement>> {
        match self.fetch_measurement(endpoint).await {
            Ok(measurement) => Ok(Some(measurement)),
            Err(reason) if self.settings.strict_measurement => Err(BenchError::Measurement(reason)),
            Err(reason) => {
                warn!("leader measurement unavailable, reporting null: {}", reason);
                Ok(None)
            }
        }
    }

    async fn fetch_measurement(&self, endpoint: &str) -> std::result::Result<LeaderMeasurement, String> {
        let client = self.connector.connect(endpoint).await.map_err(|e| e.to_string())?;
        let raw = client
            .read(MEASUREMENT_KEY, self.settings.request_timeout)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("key '{}' not found", MEASUREMENT_KEY))?;
        serde_json::from_slice(&raw).map_err(|e| format!("malformed measurement: {}", e))
    }
}

/// Join every task in spawn order; at most one observation per cluster is kept.
async fn collect(
    workers: Vec<JoinHandle<WorkerResult>>,
    observers: Vec<JoinHandle<Result<Option<ObservationEvent>>>>,
) -> Result<(Vec<WorkerResult>, Vec<ObservationEvent>)> {
    let mut results = Vec::with_capacity(workers.len());
    let mut failure = None;

    for handle in workers {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                failure.get_or_insert(BenchError::from(e));
            }
        }
    }

    let mut events: BTreeMap<usize, ObservationEvent> = BTreeMap::new();
    for handle in observers {
        match handle.await {
            Ok(Ok(Some(event))) => {
                if let Some(kept) = events.get(&event.cluster_index) {
                    warn!(
                        "cluster {} observed twice ({} and {}), keeping the first",
                        event.cluster_index, kept.endpoint, event.endpoint
                    );
                } else {
                    events.insert(event.cluster_index, event);
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert(BenchError::from(e));
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok((results, events.into_values().collect())),
    }
}
