//! Stale-sequence decoy
//!
//! Garbage placed behind the real sequence number, outside the server's
//! receive window. For client stacks that do not discard same-sequence
//! duplicates.

use super::{forge_garbage, Decoy, DecoyStrategy};
use crate::config::DecoyConfig;
use crate::error::InjectionError;
use crate::packet::Flow;
use tracing::instrument;

/// Decoy whose sequence number trails the real one
#[derive(Debug, Clone)]
pub struct StaleSeqDecoy {
    ttl: u8,
    payload_size: usize,
    offset: u32,
}

impl StaleSeqDecoy {
    /// Create with explicit TTL, payload size and sequence distance
    pub fn new(ttl: u8, payload_size: usize, offset: u32) -> Self {
        Self {
            ttl,
            payload_size,
            offset,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &DecoyConfig) -> Self {
        Self::new(config.ttl, config.fake_payload_size, config.stale_seq_offset)
    }
}

impl DecoyStrategy for StaleSeqDecoy {
    fn name(&self) -> &'static str {
        "stale_seq"
    }

    #[instrument(level = "debug", skip(self), fields(ttl = self.ttl, offset = self.offset))]
    fn forge(&self, flow: &Flow) -> Result<Decoy, InjectionError> {
        forge_garbage(
            flow,
            flow.seq.wrapping_sub(self.offset),
            self.ttl,
            self.payload_size,
        )
    }
}
