//! Leader-change observers
//!
//! One observer runs per endpoint of every secondary cluster. After the
//! reconfiguration is issued it polls its endpoint until a new leader from its
//! own cluster is reported. The endpoint that turns out to be that leader runs
//! a worker sub-pool against itself until `stop`; every other endpoint of the
//! cluster leaves quietly.

use log::{debug, error, info};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::client::{Connector, MemberId, MemberStatus, StoreClient, NO_LEADER};
use crate::clock::Timebase;
use crate::gate::Phases;
use crate::report::{Observation, Sample};
use crate::worker::{run_worker, WorkerSpec, WorkerStats};
use crate::Result;

/// Bounded exponential backoff between status polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial: Duration::from_millis(10), max: Duration::from_millis(50) }
    }
}

impl Backoff {
    /// Delay following `current`
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// What one observer watches
#[derive(Debug, Clone)]
pub struct ObserverSpec {
    pub cluster_index: usize,
    pub endpoint: String,
    /// Leader found at discovery time
    pub old_leader: MemberId,
    /// Member ids discovered for this endpoint's cluster
    pub members: BTreeSet<MemberId>,
    /// Size of the worker sub-pool started on the new leader
    pub threads: usize,
    pub request_timeout: Duration,
    pub backoff: Backoff,
}

impl ObserverSpec {
    /// Whether `leader_id` is this cluster's post-reconfiguration leader
    pub fn is_new_leader(&self, leader_id: MemberId) -> bool {
        leader_id != NO_LEADER && leader_id != self.old_leader && self.members.contains(&leader_id)
    }
}

/// Produced by the endpoint that became its cluster's new leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationEvent {
    pub cluster_index: usize,
    pub endpoint: String,
    pub leader_id: MemberId,
    /// Unix microseconds at which the leadership was observed
    pub observed_at: i64,
    pub samples: Vec<Sample>,
    pub workers: Vec<WorkerStats>,
}

impl ObservationEvent {
    pub fn into_observation(self) -> Observation {
        Observation { observe: self.observed_at, queries: self.samples }
    }
}

/// Run one observer.
///
/// Returns `Ok(None)` when the endpoint is not the new leader, when it cannot
/// be reached, or when `stop` opens before a transition was seen.
pub async fn observe(
    connector: Arc<dyn Connector>,
    spec: ObserverSpec,
    phases: Phases,
    timebase: Timebase,
) -> Result<Option<ObservationEvent>> {
    let client = match connector.connect(&spec.endpoint).await {
        Ok(client) => client,
        Err(e) => {
            error!("observer on {} cannot connect: {}", spec.endpoint, e);
            return Ok(None);
        }
    };

    tokio::select! {
        biased;
        _ = phases.issued.wait() => {}
        _ = phases.stop.wait() => {
            debug!("observer on {} stopped before reconfiguration", spec.endpoint);
            return Ok(None);
        }
    }

    let status = match wait_for_transition(&*client, &spec, &phases).await {
        Some(status) => status,
        None => {
            info!("observer on {} saw no new leader before stop", spec.endpoint);
            return Ok(None);
        }
    };

    if status.member_id != status.leader_id {
        debug!(
            "observer on {}: new leader {} is elsewhere in cluster {}",
            spec.endpoint, status.leader_id, spec.cluster_index
        );
        return Ok(None);
    }

    let observed_at = timebase.now_micros();
    info!(
        "cluster {} has new leader {} at {}, starting {} requesters",
        spec.cluster_index, status.leader_id, spec.endpoint, spec.threads
    );

    let mut handles = Vec::with_capacity(spec.threads);
    for id in 0..spec.threads {
        handles.push(tokio::spawn(run_worker(
            client.clone(),
            WorkerSpec::observer(spec.cluster_index, id, spec.request_timeout),
            None,
            phases.stop.clone(),
            timebase,
        )));
    }

    let mut samples = Vec::new();
    let mut workers = Vec::with_capacity(spec.threads);
    for handle in handles {
        let result = handle.await?;
        workers.push(result.stats());
        samples.extend(result.samples);
    }

    Ok(Some(ObservationEvent {
        cluster_index: spec.cluster_index,
        endpoint: spec.endpoint,
        leader_id: status.leader_id,
        observed_at,
        samples,
        workers,
    }))
}

/// Poll until the new-leader predicate holds; `None` once `stop` is open.
async fn wait_for_transition(
    client: &dyn StoreClient,
    spec: &ObserverSpec,
    phases: &Phases,
) -> Option<MemberStatus> {
    let mut delay = spec.backoff.initial;

    loop {
        if phases.stop.is_open() {
            return None;
        }

        match client.status().await {
            Ok(status) if spec.is_new_leader(status.leader_id) => return Some(status),
            Ok(_) => {}
            Err(e) => debug!("observe {} error: {}", spec.endpoint, e),
        }

        tokio::select! {
            _ = sleep(delay) => {}
            _ = phases.stop.wait() => {}
        }
        delay = spec.backoff.next(delay);
    }
}
