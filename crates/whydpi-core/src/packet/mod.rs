//! Packet parsing and construction
//!
//! Zero-copy parsing of intercepted IPv4/TCP datagrams and construction of
//! decoy datagrams.

mod builder;
mod types;

pub use builder::{PacketBuilder, MAX_PAYLOAD_LEN};
pub use types::*;

use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header length
pub const IPV4_HEADER_LEN: usize = 20;

/// Minimum TCP header length
pub const TCP_HEADER_LEN: usize = 20;

/// Request-line prefixes that mark an HTTP request worth a decoy
pub const HTTP_METHODS: [&[u8]; 3] = [b"GET ", b"POST ", b"HEAD "];

/// A parsed view over one intercepted IPv4 packet
///
/// Borrowed from the queue's buffer for the duration of a single dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    data: &'a [u8],
    /// Transport protocol
    pub protocol: Protocol,
    /// Source IP address
    pub src_addr: Ipv4Addr,
    /// Destination IP address
    pub dst_addr: Ipv4Addr,
    /// Source port (TCP only, 0 otherwise)
    pub src_port: u16,
    /// Destination port (TCP only, 0 otherwise)
    pub dst_port: u16,
    /// TTL
    pub ttl: u8,
    /// TCP flags (if TCP)
    pub tcp_flags: Option<TcpFlags>,
    ip_header_len: usize,
    transport_header_len: usize,
}

impl<'a> Packet<'a> {
    /// Parse a raw IPv4 datagram
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        if data.len() < IPV4_HEADER_LEN {
            return Err(Error::PacketTooSmall {
                expected: IPV4_HEADER_LEN,
                actual: data.len(),
            });
        }

        let version = data[0] >> 4;
        if version != 4 {
            return Err(Error::UnsupportedIpVersion { version });
        }

        let ip_header_len = usize::from(data[0] & 0x0F) * 4;
        if ip_header_len < IPV4_HEADER_LEN {
            return Err(Error::packet_parse_at(
                format!("IHL of {ip_header_len} bytes is below minimum"),
                0,
            ));
        }
        if data.len() < ip_header_len {
            return Err(Error::PacketTooSmall {
                expected: ip_header_len,
                actual: data.len(),
            });
        }

        // Trailing bytes beyond the IP total length are link padding
        let total_len = usize::from(u16::from_be_bytes([data[2], data[3]]));
        if total_len < ip_header_len {
            return Err(Error::packet_parse_at(
                format!("Total length {total_len} shorter than header"),
                2,
            ));
        }
        let data = &data[..total_len.min(data.len())];

        let mut packet = Self {
            data,
            protocol: Protocol::from_u8(data[9]),
            src_addr: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            dst_addr: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            src_port: 0,
            dst_port: 0,
            ttl: data[8],
            tcp_flags: None,
            ip_header_len,
            transport_header_len: 0,
        };

        if packet.protocol == Protocol::Tcp {
            packet.parse_tcp()?;
        }

        Ok(packet)
    }

    fn parse_tcp(&mut self) -> Result<()> {
        let offset = self.ip_header_len;
        let data = self.data;

        if data.len() < offset + TCP_HEADER_LEN {
            return Err(Error::PacketTooSmall {
                expected: offset + TCP_HEADER_LEN,
                actual: data.len(),
            });
        }

        self.src_port = u16::from_be_bytes([data[offset], data[offset + 1]]);
        self.dst_port = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);

        let header_len = usize::from(data[offset + 12] >> 4) * 4;
        if header_len < TCP_HEADER_LEN || data.len() < offset + header_len {
            return Err(Error::packet_parse_at(
                format!("Invalid TCP data offset ({header_len} bytes)"),
                offset + 12,
            ));
        }
        self.transport_header_len = header_len;
        self.tcp_flags = Some(TcpFlags::from_bits_truncate(data[offset + 13]));

        Ok(())
    }

    /// Check if this is a TCP packet
    pub fn is_tcp(&self) -> bool {
        matches!(self.protocol, Protocol::Tcp)
    }

    /// Get the payload (data after headers)
    pub fn payload(&self) -> &'a [u8] {
        if !self.is_tcp() {
            return &[];
        }
        let offset = self.ip_header_len + self.transport_header_len;
        self.data.get(offset..).unwrap_or(&[])
    }

    /// Get payload length
    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }

    /// Get TCP sequence number
    pub fn tcp_seq(&self) -> Option<u32> {
        self.tcp_u32(4)
    }

    /// Get TCP acknowledgment number
    pub fn tcp_ack_num(&self) -> Option<u32> {
        self.tcp_u32(8)
    }

    fn tcp_u32(&self, field: usize) -> Option<u32> {
        if !self.is_tcp() {
            return None;
        }
        let offset = self.ip_header_len + field;
        let bytes = self.data.get(offset..offset + 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Check if payload looks like a TLS handshake record (ClientHello)
    ///
    /// Content type 0x16 followed by major version 0x03; the minor version
    /// byte is not inspected.
    pub fn is_tls_client_hello(&self) -> bool {
        matches!(self.payload(), [0x16, 0x03, _, ..])
    }

    /// Check if payload starts with an HTTP request line we care about
    pub fn is_http_request(&self) -> bool {
        let payload = self.payload();
        HTTP_METHODS.iter().any(|method| payload.starts_with(method))
    }

    /// Flow identity of this packet, if it is TCP
    pub fn flow(&self) -> Option<Flow> {
        Some(Flow::new(
            self.src_addr,
            self.dst_addr,
            self.src_port,
            self.dst_port,
            self.tcp_seq()?,
        ))
    }

    /// Get the raw packet data
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Get total packet length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if packet is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
