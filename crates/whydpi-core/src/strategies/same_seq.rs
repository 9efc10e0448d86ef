//! Same-sequence decoy
//!
//! Garbage carrying the real packet's sequence number. The inspector
//! reassembles the garbage first; the low TTL keeps it from the server.

use super::{forge_garbage, Decoy, DecoyStrategy};
use crate::config::{DecoyConfig, DEFAULT_FAKE_PAYLOAD_SIZE, DEFAULT_TTL};
use crate::error::InjectionError;
use crate::packet::Flow;
use tracing::instrument;

/// Default decoy strategy
#[derive(Debug, Clone)]
pub struct SameSeqDecoy {
    ttl: u8,
    payload_size: usize,
}

impl SameSeqDecoy {
    /// Create with explicit TTL and payload size
    pub fn new(ttl: u8, payload_size: usize) -> Self {
        Self { ttl, payload_size }
    }

    /// Create from configuration
    pub fn from_config(config: &DecoyConfig) -> Self {
        Self::new(config.ttl, config.fake_payload_size)
    }
}

impl Default for SameSeqDecoy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_FAKE_PAYLOAD_SIZE)
    }
}

impl DecoyStrategy for SameSeqDecoy {
    fn name(&self) -> &'static str {
        "same_seq"
    }

    #[instrument(level = "debug", skip(self), fields(ttl = self.ttl))]
    fn forge(&self, flow: &Flow) -> Result<Decoy, InjectionError> {
        forge_garbage(flow, flow.seq, self.ttl, self.payload_size)
    }
}
