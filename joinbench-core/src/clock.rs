//! Experiment timestamps
//!
//! All timestamps of a run are taken from the monotonic clock and projected
//! onto unix microseconds through a single wall-clock anchor captured when the
//! run starts. Samples of one worker can therefore never go backwards, even if
//! the system clock is stepped mid-run.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Timebase {
    origin: Instant,
    origin_unix_micros: i64,
}

impl Timebase {
    /// Anchor a new timebase at the current instant
    pub fn now() -> Self {
        Self { origin: Instant::now(), origin_unix_micros: chrono::Utc::now().timestamp_micros() }
    }

    /// Unix microseconds of `at`
    pub fn unix_micros(&self, at: Instant) -> i64 {
        self.origin_unix_micros.saturating_add(micros(at.saturating_duration_since(self.origin)))
    }

    pub fn now_micros(&self) -> i64 {
        self.unix_micros(Instant::now())
    }
}

/// Duration as whole microseconds, saturating
pub fn micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}
