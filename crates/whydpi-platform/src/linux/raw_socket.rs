//! Raw IPv4 transmitter
//!
//! An `IPPROTO_RAW` socket: the kernel takes our IP header as-is, so the
//! decoy's TTL and checksums survive to the wire. Every datagram carries
//! [`DECOY_MARK`] so the interception rules let it pass.

use super::firewall::DECOY_MARK;
use crate::error::{PlatformError, Result};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tracing::info;
use whydpi_core::{InjectionError, RawSender};

/// [`RawSender`] over a raw IPv4 socket
pub struct RawSocketSender {
    socket: Socket,
    interface: Option<String>,
}

impl RawSocketSender {
    /// Open the socket
    ///
    /// With `interface` set the socket is pinned to that device
    /// (`SO_BINDTODEVICE`); otherwise the routing table picks the egress.
    /// `timeout` bounds every send.
    pub fn open(interface: Option<&str>, timeout: Duration) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::from(libc::IPPROTO_RAW)))
            .map_err(|e| socket_error("create raw socket", e))?;

        socket
            .set_mark(DECOY_MARK)
            .map_err(|e| socket_error("set decoy mark", e))?;

        socket
            .set_write_timeout(Some(timeout))
            .map_err(|e| socket_error("set send timeout", e))?;

        if let Some(name) = interface {
            socket
                .bind_device(Some(name.as_bytes()))
                .map_err(|e| socket_error(&format!("bind to {name}"), e))?;
        }

        info!(
            interface = interface.unwrap_or("auto"),
            timeout_ms = timeout.as_millis() as u64,
            "Raw socket ready"
        );

        Ok(Self {
            socket,
            interface: interface.map(str::to_string),
        })
    }

    /// Device the socket is bound to, if any
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }
}

impl RawSender for RawSocketSender {
    fn send(&self, datagram: &[u8], dst: Ipv4Addr) -> std::result::Result<(), InjectionError> {
        let addr = SockAddr::from(SocketAddrV4::new(dst, 0));
        match self.socket.send_to(datagram, &addr) {
            Ok(n) if n == datagram.len() => Ok(()),
            Ok(n) => Err(InjectionError::Send {
                dst,
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short send: {n} of {} bytes", datagram.len()),
                ),
            }),
            Err(e) => Err(send_error(dst, e)),
        }
    }
}

fn socket_error(action: &str, e: io::Error) -> PlatformError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        PlatformError::PermissionDenied(format!("{action}: requires root ({e})"))
    } else {
        PlatformError::Socket(format!("{action}: {e}"))
    }
}

fn send_error(dst: Ipv4Addr, e: io::Error) -> InjectionError {
    match e.raw_os_error() {
        Some(libc::ENETUNREACH | libc::EHOSTUNREACH) => InjectionError::NoRoute { dst },
        _ => InjectionError::Send { dst, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_maps_to_no_route() {
        let dst = Ipv4Addr::new(5, 6, 7, 8);
        assert!(matches!(
            send_error(dst, io::Error::from_raw_os_error(libc::ENETUNREACH)),
            InjectionError::NoRoute { .. }
        ));
        assert!(matches!(
            send_error(dst, io::Error::from_raw_os_error(libc::EHOSTUNREACH)),
            InjectionError::NoRoute { .. }
        ));
        assert!(matches!(
            send_error(dst, io::Error::from(io::ErrorKind::TimedOut)),
            InjectionError::Send { .. }
        ));
    }

    #[test]
    fn test_permission_error_mentions_root() {
        let err = socket_error("create raw socket", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, PlatformError::PermissionDenied(_)));
        assert!(err.to_string().contains("requires root"));
    }
}
