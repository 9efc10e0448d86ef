//! Handshake classification
//!
//! Decides, per intercepted packet, whether it opens a TLS or HTTP exchange
//! that should be preceded by a decoy.

use crate::packet::{ports, Packet};
use std::collections::BTreeSet;
use std::fmt;

/// Why a packet was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Not a TCP segment
    NotTcp,
    /// Destination port is outside the intercept set
    PortNotIntercepted,
    /// Segment carries no data
    EmptyPayload,
    /// Payload does not start a handshake we recognise
    NoSignature,
}

/// Result of classifying one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// TLS handshake record toward port 443
    TlsClientHello,
    /// HTTP request line toward port 80
    HttpRequest,
    /// No decoy warranted
    Pass(PassReason),
}

impl Classification {
    /// Whether a decoy should be injected
    pub fn is_bypass(self) -> bool {
        !matches!(self, Classification::Pass(_))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::TlsClientHello => f.write_str("tls_client_hello"),
            Classification::HttpRequest => f.write_str("http_request"),
            Classification::Pass(reason) => write!(f, "pass({reason:?})"),
        }
    }
}

/// Stateless packet classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    ports: BTreeSet<u16>,
}

impl Classifier {
    /// Create a classifier intercepting the given destination ports
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: ports.into_iter().collect(),
        }
    }

    /// Destination ports this classifier considers
    pub fn ports(&self) -> &BTreeSet<u16> {
        &self.ports
    }

    /// Classify a parsed packet
    pub fn classify(&self, packet: &Packet<'_>) -> Classification {
        if !packet.is_tcp() {
            return Classification::Pass(PassReason::NotTcp);
        }

        if !self.ports.contains(&packet.dst_port) {
            return Classification::Pass(PassReason::PortNotIntercepted);
        }

        if packet.payload_len() == 0 {
            return Classification::Pass(PassReason::EmptyPayload);
        }

        match packet.dst_port {
            ports::HTTPS if packet.is_tls_client_hello() => Classification::TlsClientHello,
            ports::HTTP if packet.is_http_request() => Classification::HttpRequest,
            _ => Classification::Pass(PassReason::NoSignature),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new([ports::HTTP, ports::HTTPS])
    }
}
