//! Egress interface discovery
//!
//! At boot the routing table may not be populated yet (interfaces still
//! coming up under systemd). The resolver polls a [`RouteSource`] with
//! exponential backoff and gives up with `None`, in which case decoys go out
//! through normal kernel routing.

use crate::config::ResolverConfig;
use crate::error::RouteError;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name the system gives the loopback interface
pub const LOOPBACK: &str = "lo";

/// Longest wait between two attempts
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Source of routing information
#[cfg_attr(test, mockall::automock)]
pub trait RouteSource: Send + Sync {
    /// Interface carrying the default IPv4 route, if any
    fn default_route_interface(&self) -> Result<Option<String>, RouteError>;

    /// Interface the kernel would use to reach `addr`
    fn route_to(&self, addr: Ipv4Addr) -> Result<Option<String>, RouteError>;
}

/// Bounded retry loop over a [`RouteSource`]
pub struct InterfaceResolver<R> {
    source: R,
    probe: Ipv4Addr,
    max_retries: u32,
    initial_delay: Duration,
    backoff_factor: f64,
}

impl<R: RouteSource> InterfaceResolver<R> {
    /// Create a resolver with explicit parameters
    pub fn new(
        source: R,
        probe: Ipv4Addr,
        max_retries: u32,
        initial_delay: Duration,
        backoff_factor: f64,
    ) -> Self {
        Self {
            source,
            probe,
            max_retries,
            initial_delay,
            backoff_factor,
        }
    }

    /// Create from configuration
    pub fn from_config(source: R, config: &ResolverConfig) -> Self {
        Self::new(
            source,
            config.probe_address,
            config.max_retries,
            config.initial_delay(),
            config.backoff_factor,
        )
    }

    /// Resolve the egress interface, sleeping between attempts
    pub fn resolve(&self) -> Option<String> {
        self.resolve_with(std::thread::sleep)
    }

    /// Resolve the egress interface with a caller-supplied sleep
    pub fn resolve_with<F: FnMut(Duration)>(&self, mut sleep: F) -> Option<String> {
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_retries {
            if let Some(iface) = self.attempt() {
                info!(interface = %iface, attempt, "Egress interface resolved");
                return Some(iface);
            }

            if attempt < self.max_retries {
                debug!(attempt, delay_ms = delay.as_millis() as u64, "No usable route yet, retrying");
                sleep(delay);
                delay = next_delay(delay, self.backoff_factor);
            }
        }

        warn!(
            attempts = self.max_retries,
            "Interface resolution exhausted, falling back to kernel routing"
        );
        None
    }

    fn attempt(&self) -> Option<String> {
        let primary = self.source.default_route_interface();
        if let Some(iface) = usable(primary, "default route") {
            return Some(iface);
        }
        usable(self.source.route_to(self.probe), "route lookup")
    }
}

/// `delay * factor`, capped at [`MAX_DELAY`]
fn next_delay(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
        .map_or(MAX_DELAY, |next| next.min(MAX_DELAY))
}

fn usable(answer: Result<Option<String>, RouteError>, query: &str) -> Option<String> {
    match answer {
        Ok(Some(iface)) if iface != LOOPBACK && !iface.is_empty() => Some(iface),
        Ok(Some(iface)) => {
            debug!(query, interface = %iface, "Ignoring loopback answer");
            None
        }
        Ok(None) => None,
        Err(e) => {
            debug!(query, error = %e, "Route query failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(source: MockRouteSource, retries: u32) -> InterfaceResolver<MockRouteSource> {
        InterfaceResolver::new(
            source,
            Ipv4Addr::new(8, 8, 8, 8),
            retries,
            Duration::from_secs(1),
            1.5,
        )
    }

    #[test]
    fn test_first_attempt_default_route() {
        let mut source = MockRouteSource::new();
        source
            .expect_default_route_interface()
            .times(1)
            .returning(|| Ok(Some("eth0".into())));
        source.expect_route_to().times(0);

        let mut sleeps = Vec::new();
        let iface = resolver(source, 5).resolve_with(|d| sleeps.push(d));
        assert_eq!(iface.as_deref(), Some("eth0"));
        assert!(sleeps.is_empty());
    }

    #[test]
    fn test_falls_back_to_route_lookup() {
        let mut source = MockRouteSource::new();
        source
            .expect_default_route_interface()
            .returning(|| Err(RouteError::Unavailable("no default route".into())));
        source
            .expect_route_to()
            .withf(|addr| *addr == Ipv4Addr::new(8, 8, 8, 8))
            .returning(|_| Ok(Some("wlan0".into())));

        let iface = resolver(source, 5).resolve_with(|_| {});
        assert_eq!(iface.as_deref(), Some("wlan0"));
    }

    #[test]
    fn test_loopback_answers_then_real() {
        let mut source = MockRouteSource::new();
        let mut calls = 0;
        source.expect_default_route_interface().returning(move || {
            calls += 1;
            if calls < 3 {
                Ok(Some(LOOPBACK.into()))
            } else {
                Ok(Some("enp3s0".into()))
            }
        });
        source
            .expect_route_to()
            .returning(|_| Ok(Some(LOOPBACK.into())));

        let mut sleeps = Vec::new();
        let iface = resolver(source, 5).resolve_with(|d| sleeps.push(d));
        assert_eq!(iface.as_deref(), Some("enp3s0"));
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(1000), Duration::from_millis(1500)]
        );
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut source = MockRouteSource::new();
        source
            .expect_default_route_interface()
            .times(5)
            .returning(|| Ok(None));
        source
            .expect_route_to()
            .times(5)
            .returning(|_| Ok(Some(LOOPBACK.into())));

        let mut sleeps = Vec::new();
        let iface = resolver(source, 5).resolve_with(|d| sleeps.push(d));
        assert!(iface.is_none());
        assert_eq!(sleeps.len(), 4);
        assert_eq!(sleeps[0], Duration::from_millis(1000));
        assert_eq!(sleeps[1], Duration::from_millis(1500));
        assert_eq!(sleeps[2], Duration::from_millis(2250));
        assert_eq!(sleeps[3], Duration::from_millis(3375));
    }

    #[test]
    fn test_huge_backoff_is_capped() {
        let mut source = MockRouteSource::new();
        source.expect_default_route_interface().returning(|| Ok(None));
        source
            .expect_route_to()
            .returning(|_| Ok(Some(LOOPBACK.into())));

        let resolver = InterfaceResolver::new(
            source,
            Ipv4Addr::new(8, 8, 8, 8),
            4,
            Duration::from_secs(1),
            1e300,
        );
        let mut sleeps = Vec::new();
        assert!(resolver.resolve_with(|d| sleeps.push(d)).is_none());
        assert_eq!(sleeps, vec![Duration::from_secs(1), MAX_DELAY, MAX_DELAY]);
    }

    #[test]
    fn test_next_delay() {
        assert_eq!(next_delay(Duration::from_secs(2), 1.5), Duration::from_secs(3));
        assert_eq!(next_delay(Duration::from_secs(50), 2.0), MAX_DELAY);
        assert_eq!(next_delay(Duration::from_secs(1), f64::NAN), MAX_DELAY);
        assert_eq!(next_delay(Duration::MAX, f64::MAX), MAX_DELAY);
    }
}
