//! Dispatch counters
//!
//! Updated from the worker thread, read concurrently by the status thread.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for the interception pipeline
#[derive(Debug, Default)]
pub struct Stats {
    processed: AtomicU64,
    bypassed: AtomicU64,
    accepted: AtomicU64,
    injected: AtomicU64,
    injection_errors: AtomicU64,
}

impl Stats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bypassed(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_injected(&self) {
        self.injected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_injection_error(&self) {
        self.injection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            injected: self.injected.load(Ordering::Relaxed),
            injection_errors: self.injection_errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`Stats`], suitable for persisting and printing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Packets received from the queue
    pub processed: u64,
    /// Packets classified as handshakes that warranted a decoy
    pub bypassed: u64,
    /// Accept verdicts issued
    pub accepted: u64,
    /// Decoys sent successfully
    pub injected: u64,
    /// Decoys that failed to build or send
    pub injection_errors: u64,
}
