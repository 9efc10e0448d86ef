//! Packet type definitions

use bitflags::bitflags;
use std::fmt;
use std::net::Ipv4Addr;

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP (protocol number 6)
    Tcp,
    /// UDP (protocol number 17)
    Udp,
    /// ICMP (protocol number 1)
    Icmp,
    /// Unknown protocol
    Unknown(u8),
}

impl Protocol {
    /// Create from protocol number
    pub fn from_u8(proto: u8) -> Self {
        match proto {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            other => Protocol::Unknown(other),
        }
    }

    /// Get protocol number
    pub fn to_u8(self) -> u8 {
        match self {
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Unknown(other) => other,
        }
    }
}

bitflags! {
    /// TCP header flags (byte 13 of the TCP header)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TcpFlags: u8 {
        /// No more data from sender
        const FIN = 0x01;
        /// Synchronize sequence numbers
        const SYN = 0x02;
        /// Reset the connection
        const RST = 0x04;
        /// Push buffered data to the application
        const PSH = 0x08;
        /// Acknowledgment field is significant
        const ACK = 0x10;
        /// Urgent pointer field is significant
        const URG = 0x20;
        /// ECN-Echo
        const ECE = 0x40;
        /// Congestion Window Reduced
        const CWR = 0x80;
    }
}

impl TcpFlags {
    /// Flag combination carried by every decoy
    pub const PSH_ACK: Self = Self::PSH.union(Self::ACK);
}

/// The minimal tuple needed to forge a decoy for a real stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow {
    /// Source address of the real packet
    pub src: Ipv4Addr,
    /// Destination address of the real packet
    pub dst: Ipv4Addr,
    /// Source port
    pub src_port: u16,
    /// Destination port
    pub dst_port: u16,
    /// Sequence number of the real packet
    pub seq: u32,
}

impl Flow {
    /// Create a flow identity
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, src_port: u16, dst_port: u16, seq: u32) -> Self {
        Self {
            src,
            dst,
            src_port,
            dst_port,
            seq,
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} seq={}",
            self.src, self.src_port, self.dst, self.dst_port, self.seq
        )
    }
}

/// Common well-known ports
pub mod ports {
    /// HTTP port
    pub const HTTP: u16 = 80;
    /// HTTPS port
    pub const HTTPS: u16 = 443;
}
