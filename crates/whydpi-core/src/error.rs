//! Error types for whydpi-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.
//! Parse and injection failures are always recovered by the dispatcher; only
//! configuration errors are meant to reach the user.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Main error type for whydpi-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Packet parsing failed
    #[error("Packet parsing error: {message}")]
    PacketParse {
        /// Detailed error message
        message: String,
        /// Offset in packet where error occurred
        offset: Option<usize>,
    },

    /// Packet is too small to process
    #[error("Packet too small: expected at least {expected} bytes, got {actual}")]
    PacketTooSmall {
        /// Minimum expected size
        expected: usize,
        /// Actual packet size
        actual: usize,
    },

    /// Only IPv4 is intercepted
    #[error("Unsupported IP version: {version}")]
    UnsupportedIpVersion {
        /// Version nibble found in the first byte
        version: u8,
    },

    /// Decoy construction or transmission failed
    #[error(transparent)]
    Injection(#[from] InjectionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Invalid port number
    #[error("Invalid port number: {port} (must be 1-65535)")]
    InvalidPort {
        /// The invalid port
        port: u32,
    },

    /// Invalid TTL value
    #[error("Invalid TTL value: {ttl} (must be 1-255)")]
    InvalidTtl {
        /// The invalid TTL
        ttl: u16,
    },

    /// Invalid decoy payload size
    #[error("Invalid fake payload size: {size} (must be 1-{max})")]
    InvalidPayloadSize {
        /// Requested size
        size: usize,
        /// Largest size that fits one unfragmented datagram
        max: usize,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a packet parse error
    pub fn packet_parse(message: impl Into<String>) -> Self {
        Self::PacketParse {
            message: message.into(),
            offset: None,
        }
    }

    /// Create a packet parse error with offset
    pub fn packet_parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::PacketParse {
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from parsing an intercepted packet
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::PacketParse { .. } | Self::PacketTooSmall { .. } | Self::UnsupportedIpVersion { .. }
        )
    }
}

/// Decoy construction or transmission failure
///
/// Counted and logged by the injector; never affects the real packet.
#[derive(Error, Debug)]
pub enum InjectionError {
    /// The decoy datagram could not be assembled
    #[error("Failed to build decoy: {0}")]
    Build(String),

    /// The decoy would not fit one datagram
    #[error("Decoy payload of {size} bytes exceeds maximum of {max}")]
    PayloadTooLarge {
        /// Requested payload size
        size: usize,
        /// Maximum payload size
        max: usize,
    },

    /// Kernel has no route toward the destination
    #[error("No route to {dst}")]
    NoRoute {
        /// Decoy destination
        dst: Ipv4Addr,
    },

    /// The raw send itself failed
    #[error("Failed to send decoy to {dst}: {source}")]
    Send {
        /// Decoy destination
        dst: Ipv4Addr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },
}

/// Routing-table query failure
#[derive(Error, Debug)]
pub enum RouteError {
    /// The routing table has no usable answer yet
    #[error("Route unavailable: {0}")]
    Unavailable(String),

    /// Route information could not be understood
    #[error("Malformed route information: {0}")]
    Malformed(String),

    /// I/O error while querying the system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
