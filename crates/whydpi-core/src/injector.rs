//! Decoy injection
//!
//! Couples the configured [`DecoyStrategy`] with a raw transmitter and keeps
//! the injection counters.

use crate::error::InjectionError;
use crate::packet::Flow;
use crate::pipeline::Stats;
use crate::strategies::DecoyStrategy;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw IPv4 transmitter for forged datagrams
#[cfg_attr(test, mockall::automock)]
pub trait RawSender: Send {
    /// Send a complete IPv4 datagram (header included) toward `dst`
    fn send(&self, datagram: &[u8], dst: Ipv4Addr) -> Result<(), InjectionError>;
}

/// Forges and sends one decoy per bypassed packet
pub struct Injector {
    strategy: Box<dyn DecoyStrategy>,
    sender: Box<dyn RawSender>,
    interface: Option<String>,
    stats: Arc<Stats>,
}

impl Injector {
    /// Create an injector
    ///
    /// `interface` is the egress chosen at boot, if any; it is fixed for the
    /// lifetime of the injector.
    pub fn new(
        strategy: Box<dyn DecoyStrategy>,
        sender: Box<dyn RawSender>,
        interface: Option<String>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            strategy,
            sender,
            interface,
            stats,
        }
    }

    /// Egress interface resolved at construction
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Name of the active strategy
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Forge and transmit a decoy for `flow`
    pub fn inject(&self, flow: &Flow) -> Result<(), InjectionError> {
        let result = self
            .strategy
            .forge(flow)
            .and_then(|decoy| self.sender.send(&decoy.datagram, flow.dst));

        match &result {
            Ok(()) => {
                self.stats.record_injected();
                debug!(
                    flow = %flow,
                    strategy = self.strategy.name(),
                    interface = self.interface().unwrap_or("auto"),
                    "Decoy sent"
                );
            }
            Err(e) => {
                self.stats.record_injection_error();
                warn!(flow = %flow, error = %e, "Decoy injection failed");
            }
        }

        result
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("strategy", &self.strategy.name())
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::SameSeqDecoy;

    fn flow() -> Flow {
        Flow::new(
            Ipv4Addr::new(1, 2, 3, 4),
            Ipv4Addr::new(5, 6, 7, 8),
            40000,
            443,
            1000,
        )
    }

    #[test]
    fn test_inject_sends_to_flow_destination() {
        let mut sender = MockRawSender::new();
        sender
            .expect_send()
            .withf(|datagram, dst| {
                datagram.len() == 40 + 500
                    && datagram[8] == 3
                    && *dst == Ipv4Addr::new(5, 6, 7, 8)
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let stats = Arc::new(Stats::new());
        let injector = Injector::new(
            Box::new(SameSeqDecoy::default()),
            Box::new(sender),
            Some("eth0".into()),
            stats.clone(),
        );

        assert!(injector.inject(&flow()).is_ok());
        assert_eq!(injector.interface(), Some("eth0"));
        assert_eq!(stats.snapshot().injected, 1);
        assert_eq!(stats.snapshot().injection_errors, 0);
    }

    #[test]
    fn test_send_failure_is_counted() {
        let mut sender = MockRawSender::new();
        sender
            .expect_send()
            .returning(|_, dst| Err(InjectionError::NoRoute { dst }));

        let stats = Arc::new(Stats::new());
        let injector = Injector::new(
            Box::new(SameSeqDecoy::default()),
            Box::new(sender),
            None,
            stats.clone(),
        );

        assert!(matches!(
            injector.inject(&flow()),
            Err(InjectionError::NoRoute { .. })
        ));
        assert_eq!(stats.snapshot().injected, 0);
        assert_eq!(stats.snapshot().injection_errors, 1);
    }

    #[test]
    fn test_forge_failure_skips_send() {
        let mut sender = MockRawSender::new();
        sender.expect_send().times(0);

        let stats = Arc::new(Stats::new());
        let injector = Injector::new(
            Box::new(SameSeqDecoy::new(3, 5000)),
            Box::new(sender),
            None,
            stats.clone(),
        );

        assert!(injector.inject(&flow()).is_err());
        assert_eq!(stats.snapshot().injection_errors, 1);
    }
}
