//! Request workers
//!
//! A worker is bound to one target client. Once its start gate opens it sends
//! write requests back to back, timing each one, until the `stop` gate is seen
//! open. Failed requests are logged and dropped; they never end the worker.
//! The sample buffer is private to the worker and handed over whole when the
//! task finishes.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::client::StoreClient;
use crate::clock::{micros, Timebase};
use crate::gate::Gate;
use crate::report::Sample;

/// Key prefix of workers loading the original leader
pub const PRIMARY_PREFIX: &str = "thread";

/// Identity and request parameters of one worker
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Unique within the worker's pool
    pub id: usize,
    /// Unique per pool, keeps keys of concurrent pools apart
    pub key_prefix: String,
    pub request_timeout: Duration,
}

impl WorkerSpec {
    pub fn primary(id: usize, request_timeout: Duration) -> Self {
        Self { id, key_prefix: PRIMARY_PREFIX.to_string(), request_timeout }
    }

    pub fn observer(cluster_index: usize, id: usize, request_timeout: Duration) -> Self {
        Self { id, key_prefix: format!("observer-{}", cluster_index), request_timeout }
    }

    /// Key written by attempt `seq`
    pub fn key(&self, seq: u64) -> String {
        format!("{}-{}-{}", self.key_prefix, self.id, seq)
    }
}

/// Everything a worker produced, handed over when it terminates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    pub worker_id: usize,
    /// Successful requests in issue order
    pub samples: Vec<Sample>,
    pub attempts: u64,
    pub failures: u64,
}

impl WorkerResult {
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            worker_id: self.worker_id,
            samples: self.samples.len(),
            attempts: self.attempts,
            failures: self.failures,
        }
    }
}

/// Counters of a finished worker, kept after its samples moved into a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub samples: usize,
    pub attempts: u64,
    pub failures: u64,
}

/// Run one worker to completion.
///
/// With `start` set the worker blocks on it first; observer sub-pools pass
/// `None` because they are spawned after their phase began.
pub async fn run_worker(
    client: Arc<dyn StoreClient>,
    spec: WorkerSpec,
    start: Option<Gate>,
    stop: Gate,
    timebase: Timebase,
) -> WorkerResult {
    if let Some(gate) = start {
        gate.wait().await;
    }

    let mut samples = Vec::new();
    let mut attempts = 0u64;
    let mut failures = 0u64;

    while !stop.is_open() {
        let seq = attempts;
        let key = spec.key(seq);
        let begin = Instant::now();

        match client.write(&key, &seq.to_string(), spec.request_timeout).await {
            Ok(()) => samples.push(Sample {
                start: timebase.unix_micros(begin),
                latency: micros(begin.elapsed()),
            }),
            Err(e) => {
                failures += 1;
                warn!(
                    "{} {} sending request #{} to {} error: {}",
                    spec.key_prefix,
                    spec.id,
                    seq,
                    client.endpoint(),
                    e
                );
            }
        }
        attempts += 1;
    }

    debug!(
        "{} {} finished: {} samples, {} attempts, {} failures",
        spec.key_prefix,
        spec.id,
        samples.len(),
        attempts,
        failures
    );

    WorkerResult { worker_id: spec.id, samples, attempts, failures }
}
