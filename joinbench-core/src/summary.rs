//! Latency statistics for console output

use std::fmt;

use crate::report::Sample;

/// Latency distribution of a set of samples, in microseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub min: i64,
    pub mean: f64,
    pub max: i64,
    pub p50: i64,
    pub p95: i64,
    pub p99: i64,
}

impl LatencySummary {
    /// `None` for an empty sample set
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<i64> = samples.iter().map(|s| s.latency).collect();
        sorted.sort_unstable();

        let total: i128 = sorted.iter().map(|&l| l as i128).sum();

        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            mean: total as f64 / sorted.len() as f64,
            max: sorted[sorted.len() - 1],
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        })
    }
}

fn percentile(sorted: &[i64], percentile: f64) -> i64 {
    let index = ((percentile / 100.0) * sorted.len() as f64) as usize;
    sorted[index.min(sorted.len() - 1)]
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Requests: {}", self.count)?;
        writeln!(f, "   Min:      {:.3} ms", self.min as f64 / 1000.0)?;
        writeln!(f, "   Mean:     {:.3} ms", self.mean / 1000.0)?;
        writeln!(f, "   P50:      {:.3} ms", self.p50 as f64 / 1000.0)?;
        writeln!(f, "   P95:      {:.3} ms", self.p95 as f64 / 1000.0)?;
        writeln!(f, "   P99:      {:.3} ms", self.p99 as f64 / 1000.0)?;
        write!(f, "   Max:      {:.3} ms", self.max as f64 / 1000.0)
    }
}
