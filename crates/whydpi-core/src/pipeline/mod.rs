//! Packet dispatch
//!
//! Turns each intercepted datagram into a verdict, injecting a decoy first
//! when the packet opens a TLS or HTTP exchange.

mod stats;

pub use stats::{Stats, StatsSnapshot};

use crate::classifier::{Classification, Classifier};
use crate::error::{Error, Result};
use crate::injector::Injector;
use crate::packet::Packet;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Verdict returned to the packet queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the real packet continue unchanged
    Accept,
}

/// Per-packet dispatcher
///
/// Stateless across packets apart from the shared counters.
#[derive(Debug)]
pub struct Dispatcher {
    classifier: Classifier,
    injector: Injector,
    stats: Arc<Stats>,
}

impl Dispatcher {
    /// Create a dispatcher
    ///
    /// `stats` should be the same instance handed to the injector so that
    /// every counter lives in one place.
    pub fn new(classifier: Classifier, injector: Injector, stats: Arc<Stats>) -> Self {
        Self {
            classifier,
            injector,
            stats,
        }
    }

    /// Handle one intercepted datagram
    ///
    /// Always accepts. Parse or injection failures are logged and counted,
    /// never turned into a drop.
    pub fn handle(&self, data: &[u8]) -> Verdict {
        self.stats.record_processed();

        if let Err(e) = self.evaluate(data) {
            if reportable(&e) {
                trace!(error = %e, len = data.len(), "Packet not evaluated");
            }
        }

        self.stats.record_accepted();
        Verdict::Accept
    }

    #[instrument(level = "debug", skip_all, fields(len = data.len()))]
    fn evaluate(&self, data: &[u8]) -> Result<Classification> {
        let packet = Packet::from_bytes(data)?;
        let classification = self.classifier.classify(&packet);

        if classification.is_bypass() {
            if let Some(flow) = packet.flow() {
                self.stats.record_bypassed();
                debug!(flow = %flow, kind = %classification, "Handshake intercepted");
                self.injector.inject(&flow)?;
            }
        }

        Ok(classification)
    }

    /// Current counter values
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared handle on the live counters
    pub fn stats_handle(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// The injector driven by this dispatcher
    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// The classifier in use
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

/// Injection failures are already counted and logged by the injector
fn reportable(err: &Error) -> bool {
    !matches!(err, Error::Injection(_))
}
