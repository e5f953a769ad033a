//! One-shot broadcast gates
//!
//! A [`Gate`] starts closed and is opened exactly once. Opening releases every
//! current waiter, and any waiter arriving later passes straight through.
//! Gates are never reset.

use log::info;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Gate {
    name: &'static str,
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { name, tx: Arc::new(tx) }
    }

    /// Open the gate. Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        let was_open = self.tx.send_replace(true);
        if !was_open {
            info!("gate '{}' opened", self.name);
        }
        !was_open
    }

    /// Non-blocking check
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// The three gates sequencing one experiment run
#[derive(Debug, Clone)]
pub struct Phases {
    /// Opened once every worker and observer has been spawned
    pub start: Gate,
    /// Opened right after the reconfiguration call succeeded
    pub issued: Gate,
    /// Opened once the post-delay has elapsed, or when the run is aborted
    pub stop: Gate,
}

impl Phases {
    pub fn new() -> Self {
        Self { start: Gate::new("start"), issued: Gate::new("issued"), stop: Gate::new("stop") }
    }
}

impl Default for Phases {
    fn default() -> Self {
        Self::new()
    }
}
