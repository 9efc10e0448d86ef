//! Configuration management for whyDPI
//!
//! Strongly-typed configuration with TOML support. Every section falls back
//! to its defaults, so a partial file (or no file at all) is valid.

use crate::error::{Error, Result};
use crate::packet::{ports, MAX_PAYLOAD_LEN};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default NFQUEUE number
pub const DEFAULT_QUEUE_ID: u16 = 200;

/// Default decoy TTL: reaches the inspector, expires before the server
pub const DEFAULT_TTL: u8 = 3;

/// Default decoy payload size in bytes
pub const DEFAULT_FAKE_PAYLOAD_SIZE: usize = 500;

/// Largest accepted `resolver.backoff_factor`
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

/// Largest accepted `resolver.initial_delay_ms`
pub const MAX_INITIAL_DELAY_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packet queue settings
    pub queue: QueueConfig,
    /// Which traffic is intercepted
    pub intercept: InterceptConfig,
    /// Decoy synthesis
    pub decoy: DecoyConfig,
    /// Boot-time interface discovery
    pub resolver: ResolverConfig,
    /// Raw send behaviour
    pub send: SendConfig,
    /// DNS resolver reconfiguration
    pub dns: DnsConfig,
    /// Status snapshot persistence
    pub status: StatusConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.intercept.ports.is_empty() {
            return Err(Error::config_value(
                "intercept.ports",
                "At least one port must be intercepted",
            ));
        }
        if let Some(&port) = self.intercept.ports.iter().find(|&&p| p == 0) {
            return Err(Error::InvalidPort { port: port.into() });
        }

        if self.decoy.ttl == 0 {
            return Err(Error::InvalidTtl {
                ttl: self.decoy.ttl.into(),
            });
        }

        let size = self.decoy.fake_payload_size;
        if size == 0 || size > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidPayloadSize {
                size,
                max: MAX_PAYLOAD_LEN,
            });
        }

        if self.resolver.max_retries == 0 {
            return Err(Error::config_value("resolver.max_retries", "Must be at least 1"));
        }
        if !(1.0..=MAX_BACKOFF_FACTOR).contains(&self.resolver.backoff_factor) {
            return Err(Error::config_value(
                "resolver.backoff_factor",
                format!("Must be between 1.0 and {MAX_BACKOFF_FACTOR}"),
            ));
        }
        if self.resolver.initial_delay_ms > MAX_INITIAL_DELAY_MS {
            return Err(Error::config_value(
                "resolver.initial_delay_ms",
                format!("Must be at most {MAX_INITIAL_DELAY_MS}"),
            ));
        }

        if self.dns.servers.is_empty() {
            return Err(Error::config_value("dns.servers", "At least one server is required"));
        }

        if self.status.interval_secs == 0 {
            return Err(Error::config_value("status.interval_secs", "Must be at least 1"));
        }

        Ok(())
    }
}

/// Packet queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// NFQUEUE number the firewall rules point at
    pub queue_id: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_id: DEFAULT_QUEUE_ID,
        }
    }
}

/// Interception settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Destination ports redirected to the queue
    pub ports: Vec<u16>,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            ports: vec![ports::HTTP, ports::HTTPS],
        }
    }
}

/// Which decoy strategy forges packets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Reuse the real packet's sequence number
    #[default]
    SameSeq,
    /// Move the sequence number behind the real one
    StaleSeq,
}

impl StrategyKind {
    /// Parse a strategy name as used in config files and on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "same_seq" => Some(Self::SameSeq),
            "stale_seq" => Some(Self::StaleSeq),
            _ => None,
        }
    }

    /// Name used in config files
    pub fn name(self) -> &'static str {
        match self {
            Self::SameSeq => "same_seq",
            Self::StaleSeq => "stale_seq",
        }
    }
}

/// Decoy synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoyConfig {
    /// Selected strategy
    pub strategy: StrategyKind,
    /// TTL of forged packets
    pub ttl: u8,
    /// Random payload length in bytes
    pub fake_payload_size: usize,
    /// Sequence distance used by `stale_seq`
    pub stale_seq_offset: u32,
}

impl Default for DecoyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            ttl: DEFAULT_TTL,
            fake_payload_size: DEFAULT_FAKE_PAYLOAD_SIZE,
            stale_seq_offset: 10_000,
        }
    }
}

/// Interface discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Attempts before giving up
    pub max_retries: u32,
    /// Wait before the second attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Multiplier applied to the wait after each failed attempt
    pub backoff_factor: f64,
    /// Address used for the fallback routing lookup
    pub probe_address: Ipv4Addr,
}

impl ResolverConfig {
    /// Initial delay as a duration
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 1000,
            backoff_factor: 1.5,
            probe_address: Ipv4Addr::new(8, 8, 8, 8),
        }
    }
}

/// Raw send settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// Bind the raw socket to the resolved interface
    pub bind_interface: bool,
    /// Upper bound on a single send, in milliseconds
    pub timeout_ms: u64,
}

impl SendConfig {
    /// Send timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            bind_interface: true,
            timeout_ms: 100,
        }
    }
}

/// DNS reconfiguration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Nameservers written to resolv.conf, primary first
    pub servers: Vec<Ipv4Addr>,
    /// Resolver configuration file
    pub resolv_conf: PathBuf,
    /// Where the original resolv.conf is kept
    pub backup_path: PathBuf,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: vec![Ipv4Addr::new(77, 88, 8, 8), Ipv4Addr::new(77, 88, 8, 1)],
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            backup_path: PathBuf::from("/etc/resolv.conf.whyDPI.backup"),
        }
    }
}

/// Status snapshot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// JSON file the running daemon keeps up to date
    pub path: PathBuf,
    /// Seconds between snapshots
    pub interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/run/whydpi/status.json"),
            interval_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue.queue_id, 200);
        assert_eq!(config.intercept.ports, vec![80, 443]);
        assert_eq!(config.decoy.ttl, 3);
        assert_eq!(config.decoy.fake_payload_size, 500);
        assert_eq!(config.decoy.strategy, StrategyKind::SameSeq);
        assert_eq!(config.resolver.max_retries, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.decoy.strategy = StrategyKind::StaleSeq;
        config.intercept.ports = vec![80, 443, 8443];

        let toml = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_toml_parse_minimal() {
        let toml_content = r#"
[decoy]
ttl = 5
strategy = "stale_seq"
"#;
        let config = Config::from_toml(toml_content).unwrap();
        assert_eq!(config.decoy.ttl, 5);
        assert_eq!(config.decoy.strategy, StrategyKind::StaleSeq);
        assert_eq!(config.decoy.fake_payload_size, 500);
        assert_eq!(config.queue.queue_id, 200);
    }

    #[test]
    fn test_toml_parse_invalid() {
        assert!(Config::from_toml("this is not [valid toml").is_err());
        assert!(Config::from_toml("[decoy]\nttl = 300").is_err());
        assert!(Config::from_toml("[decoy]\nstrategy = \"bogus\"").is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.decoy.ttl = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidTtl { ttl: 0 })));
    }

    #[test]
    fn test_validate_rejects_bad_ports() {
        let mut config = Config::default();
        config.intercept.ports.clear();
        assert!(config.validate().is_err());

        config.intercept.ports = vec![443, 0];
        assert!(matches!(config.validate(), Err(Error::InvalidPort { port: 0 })));
    }

    #[test]
    fn test_validate_payload_size_bounds() {
        let mut config = Config::default();
        config.decoy.fake_payload_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidPayloadSize { .. })));

        config.decoy.fake_payload_size = MAX_PAYLOAD_LEN;
        assert!(config.validate().is_ok());

        config.decoy.fake_payload_size = MAX_PAYLOAD_LEN + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_resolver() {
        let mut config = Config::default();
        config.resolver.backoff_factor = 0.5;
        assert!(config.validate().is_err());

        config.resolver.backoff_factor = 1e300;
        assert!(config.validate().is_err());

        config.resolver.backoff_factor = f64::NAN;
        assert!(config.validate().is_err());

        config.resolver.backoff_factor = MAX_BACKOFF_FACTOR;
        assert!(config.validate().is_ok());

        config.resolver.initial_delay_ms = MAX_INITIAL_DELAY_MS + 1;
        assert!(config.validate().is_err());

        config.resolver.initial_delay_ms = 1000;
        config.resolver.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strategy_from_name() {
        assert_eq!(StrategyKind::from_name("same_seq"), Some(StrategyKind::SameSeq));
        assert_eq!(StrategyKind::from_name("Stale-Seq"), Some(StrategyKind::StaleSeq));
        assert_eq!(StrategyKind::from_name("fragment"), None);
        assert_eq!(StrategyKind::StaleSeq.name(), "stale_seq");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/whydpi.toml");
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }
}
