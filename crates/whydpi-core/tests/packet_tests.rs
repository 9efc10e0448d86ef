//! Integration tests for packet module
//!
//! Parsing of intercepted datagrams and construction of decoys.

use std::net::Ipv4Addr;
use whydpi_core::packet::*;
use whydpi_core::strategies::{DecoyStrategy, SameSeqDecoy};

/// Build an IPv4/TCP datagram with a 20-byte header and the given payload
fn tcp_datagram(src_port: u16, dst_port: u16, seq: u32, payload: &[u8]) -> Vec<u8> {
    let total_len = (20 + 20 + payload.len()) as u16;
    let seq = seq.to_be_bytes();

    let mut packet = vec![
        // IPv4 header (20 bytes)
        0x45, 0x00,
        (total_len >> 8) as u8, (total_len & 0xFF) as u8,
        0x00, 0x01, 0x40, 0x00,
        0x40, 0x06, 0x00, 0x00,
        0xC0, 0xA8, 0x01, 0x01, // Source IP: 192.168.1.1
        0x5D, 0xB8, 0xD8, 0x22, // Dest IP: 93.184.216.34
        // TCP header (20 bytes)
        (src_port >> 8) as u8, (src_port & 0xFF) as u8,
        (dst_port >> 8) as u8, (dst_port & 0xFF) as u8,
        seq[0], seq[1], seq[2], seq[3],
        0x00, 0x00, 0x00, 0x00, // Acknowledgment Number
        0x50, 0x18, 0xFF, 0xFF, // Data Offset, PSH+ACK flags, Window Size
        0x00, 0x00, 0x00, 0x00, // Checksum, Urgent Pointer
    ];
    packet.extend_from_slice(payload);
    packet
}

#[test]
fn test_parse_http_get() {
    let data = tcp_datagram(1234, 80, 1, b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
    let packet = Packet::from_bytes(&data).unwrap();

    assert!(packet.is_tcp());
    assert!(packet.is_http_request());
    assert!(!packet.is_tls_client_hello());
    assert_eq!(packet.dst_addr, Ipv4Addr::new(93, 184, 216, 34));
    assert_eq!(packet.payload_len(), 37);
}

#[test]
fn test_parse_tls_record() {
    let data = tcp_datagram(40000, 443, 7, &[0x16, 0x03, 0x01, 0x02, 0x00, 0x01]);
    let packet = Packet::from_bytes(&data).unwrap();
    assert!(packet.is_tls_client_hello());

    let flow = packet.flow().unwrap();
    assert_eq!(flow.src, Ipv4Addr::new(192, 168, 1, 1));
    assert_eq!(flow.dst_port, 443);
    assert_eq!(flow.seq, 7);
}

#[test]
fn test_tcp_options_skipped() {
    let mut data = tcp_datagram(1234, 80, 1, &[]);
    // Data offset of 6 words with one 4-byte NOP option block
    data[32] = 0x60;
    data.extend_from_slice(&[0x01, 0x01, 0x01, 0x01]);
    data.extend_from_slice(b"HEAD / HTTP/1.0\r\n");
    let total_len = data.len() as u16;
    data[2..4].copy_from_slice(&total_len.to_be_bytes());

    let packet = Packet::from_bytes(&data).unwrap();
    assert!(packet.is_http_request());
    assert_eq!(packet.payload_len(), 17);
}

#[test]
fn test_bad_data_offset_rejected() {
    let mut data = tcp_datagram(1234, 80, 1, b"GET ");
    data[32] = 0x30;
    let err = Packet::from_bytes(&data).unwrap_err();
    assert!(err.is_parse_error());
}

#[test]
fn test_decoy_for_reference_flow() {
    let flow = Flow::new(
        Ipv4Addr::new(1, 2, 3, 4),
        Ipv4Addr::new(5, 6, 7, 8),
        40000,
        443,
        1000,
    );
    let strategy = SameSeqDecoy::new(3, 500);
    let first = strategy.forge(&flow).unwrap();
    let second = strategy.forge(&flow).unwrap();

    for decoy in [&first, &second] {
        let packet = Packet::from_bytes(&decoy.datagram).unwrap();
        assert_eq!(packet.dst_addr, Ipv4Addr::new(5, 6, 7, 8));
        assert_eq!(packet.dst_port, 443);
        assert_eq!(packet.ttl, 3);
        assert_eq!(packet.tcp_flags, Some(TcpFlags::PSH_ACK));
        assert_eq!(packet.tcp_seq(), Some(1000));
        assert_eq!(packet.payload_len(), 500);
    }

    let first_payload = Packet::from_bytes(&first.datagram).unwrap().payload();
    let second_payload = Packet::from_bytes(&second.datagram).unwrap().payload();
    assert_ne!(first_payload, second_payload);
}

#[test]
fn test_decoy_checksums_verify() {
    use pnet_packet::ipv4::{self, Ipv4Packet};
    use pnet_packet::tcp::{self, TcpPacket};

    let src = Ipv4Addr::new(1, 2, 3, 4);
    let dst = Ipv4Addr::new(5, 6, 7, 8);
    let decoy = SameSeqDecoy::default()
        .forge(&Flow::new(src, dst, 40000, 443, 1000))
        .unwrap();

    let ip = Ipv4Packet::new(&decoy.datagram).unwrap();
    assert_eq!(ipv4::checksum(&ip), ip.get_checksum());

    let segment = TcpPacket::new(&decoy.datagram[IPV4_HEADER_LEN..]).unwrap();
    assert_eq!(tcp::ipv4_checksum(&segment, &src, &dst), segment.get_checksum());
    assert_eq!(segment.get_window(), 8192);
}
