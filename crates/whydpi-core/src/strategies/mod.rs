//! Decoy strategies
//!
//! A strategy forges the garbage datagram injected ahead of a real handshake
//! packet. Each strategy implements [`DecoyStrategy`]; the active one is
//! picked from configuration by [`StrategyBuilder`].

mod same_seq;
mod stale_seq;

pub use same_seq::SameSeqDecoy;
pub use stale_seq::StaleSeqDecoy;

use crate::config::{DecoyConfig, StrategyKind};
use crate::error::InjectionError;
use crate::packet::{Flow, PacketBuilder, TcpFlags};
use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::trace;

/// A forged datagram ready for raw transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoy {
    /// Complete IPv4 datagram, headers included
    pub datagram: Bytes,
}

impl Decoy {
    /// Datagram length in bytes
    pub fn len(&self) -> usize {
        self.datagram.len()
    }

    /// Whether the datagram is empty
    pub fn is_empty(&self) -> bool {
        self.datagram.is_empty()
    }
}

/// Trait for decoy forging strategies
pub trait DecoyStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Forge a decoy for the given real flow
    fn forge(&self, flow: &Flow) -> Result<Decoy, InjectionError>;
}

/// Builder for creating the configured strategy
pub struct StrategyBuilder;

impl StrategyBuilder {
    /// Create the strategy selected by `config.strategy`
    pub fn from_config(config: &DecoyConfig) -> Box<dyn DecoyStrategy> {
        match config.strategy {
            StrategyKind::SameSeq => Box::new(SameSeqDecoy::from_config(config)),
            StrategyKind::StaleSeq => Box::new(StaleSeqDecoy::from_config(config)),
        }
    }
}

/// Build a PSH+ACK datagram on `flow` carrying `size` random bytes
fn forge_garbage(flow: &Flow, seq: u32, ttl: u8, size: usize) -> Result<Decoy, InjectionError> {
    let mut payload = vec![0u8; size];
    OsRng.fill_bytes(&mut payload);

    trace!(
        flow = %flow,
        head = %hex::encode(&payload[..payload.len().min(16)]),
        "Generated decoy payload"
    );

    let datagram = PacketBuilder::tcp_v4()
        .src_ip(flow.src)
        .dst_ip(flow.dst)
        .src_port(flow.src_port)
        .dst_port(flow.dst_port)
        .ttl(ttl)
        .identification(OsRng.next_u32() as u16)
        .flags(TcpFlags::PSH_ACK)
        .seq(seq)
        .ack(0)
        .payload(payload)
        .build()?;

    Ok(Decoy { datagram })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_strategy_builder() {
        let mut config = DecoyConfig::default();
        assert_eq!(StrategyBuilder::from_config(&config).name(), "same_seq");

        config.strategy = StrategyKind::StaleSeq;
        assert_eq!(StrategyBuilder::from_config(&config).name(), "stale_seq");
    }

    #[test]
    fn test_oversized_garbage_is_an_error() {
        let flow = Flow::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, 1, 443, 0);
        let result = forge_garbage(&flow, 0, 3, 4000);
        assert!(matches!(result, Err(InjectionError::PayloadTooLarge { .. })));
    }
}
