//! Packet builder utilities

use super::{TcpFlags, IPV4_HEADER_LEN, TCP_HEADER_LEN};
use crate::error::InjectionError;
use bytes::{Bytes, BytesMut};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, Ipv4Flags, MutableIpv4Packet};
use pnet_packet::tcp::{self, MutableTcpPacket};
use std::net::Ipv4Addr;

/// Largest payload that keeps a decoy inside one 1500-byte Ethernet frame
pub const MAX_PAYLOAD_LEN: usize = 1500 - IPV4_HEADER_LEN - TCP_HEADER_LEN;

/// Builder for IPv4/TCP datagrams with valid checksums
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    ttl: u8,
    identification: u16,
    tcp_flags: TcpFlags,
    seq: u32,
    ack: u32,
    window: u16,
    payload: Vec<u8>,
}

impl PacketBuilder {
    /// Create new IPv4 TCP packet builder
    pub fn tcp_v4() -> Self {
        Self {
            src_ip: Ipv4Addr::UNSPECIFIED,
            dst_ip: Ipv4Addr::UNSPECIFIED,
            src_port: 0,
            dst_port: 0,
            ttl: 64,
            identification: 0,
            tcp_flags: TcpFlags::empty(),
            seq: 0,
            ack: 0,
            window: 8192,
            payload: Vec::new(),
        }
    }

    /// Set source IP
    pub fn src_ip(mut self, ip: Ipv4Addr) -> Self {
        self.src_ip = ip;
        self
    }

    /// Set destination IP
    pub fn dst_ip(mut self, ip: Ipv4Addr) -> Self {
        self.dst_ip = ip;
        self
    }

    /// Set source port
    pub fn src_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    /// Set destination port
    pub fn dst_port(mut self, port: u16) -> Self {
        self.dst_port = port;
        self
    }

    /// Set TTL
    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set IP identification
    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    /// Set TCP flags
    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.tcp_flags = flags;
        self
    }

    /// Set sequence number
    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    /// Set acknowledgment number
    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    /// Set window size
    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Set payload
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the datagram, computing IP and TCP checksums
    pub fn build(self) -> Result<Bytes, InjectionError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(InjectionError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let total_len = IPV4_HEADER_LEN + TCP_HEADER_LEN + self.payload.len();
        let mut buffer = BytesMut::zeroed(total_len);

        {
            let mut ip = MutableIpv4Packet::new(&mut buffer[..])
                .ok_or_else(|| InjectionError::Build("buffer too small for IPv4 header".into()))?;
            ip.set_version(4);
            ip.set_header_length((IPV4_HEADER_LEN / 4) as u8);
            ip.set_total_length(total_len as u16);
            ip.set_identification(self.identification);
            ip.set_flags(Ipv4Flags::DontFragment);
            ip.set_ttl(self.ttl);
            ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
            ip.set_source(self.src_ip);
            ip.set_destination(self.dst_ip);
            let checksum = ipv4::checksum(&ip.to_immutable());
            ip.set_checksum(checksum);
        }

        {
            let mut segment = MutableTcpPacket::new(&mut buffer[IPV4_HEADER_LEN..])
                .ok_or_else(|| InjectionError::Build("buffer too small for TCP header".into()))?;
            segment.set_source(self.src_port);
            segment.set_destination(self.dst_port);
            segment.set_sequence(self.seq);
            segment.set_acknowledgement(self.ack);
            segment.set_data_offset((TCP_HEADER_LEN / 4) as u8);
            segment.set_flags(self.tcp_flags.bits());
            segment.set_window(self.window);
            segment.set_payload(&self.payload);
            let checksum = tcp::ipv4_checksum(&segment.to_immutable(), &self.src_ip, &self.dst_ip);
            segment.set_checksum(checksum);
        }

        Ok(buffer.freeze())
    }
}
