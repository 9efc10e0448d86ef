//! Platform-agnostic traits for packet delivery
//!
//! These traits define the interface that platform-specific queues must follow.

use crate::Result;
use whydpi_core::Verdict;

/// A packet held by the kernel until a verdict is issued
pub trait QueuedPacket {
    /// Raw IPv4 datagram
    fn payload(&self) -> &[u8];
}

/// Source of intercepted packets
///
/// Implemented by platform-specific backends (NFQUEUE on Linux).
pub trait PacketQueue {
    /// Message type handed out by [`recv`](Self::recv)
    type Message: QueuedPacket;

    /// Receive the next packet
    ///
    /// Returns `Ok(None)` when nothing is pending; callers poll again.
    fn recv(&mut self) -> Result<Option<Self::Message>>;

    /// Issue the verdict for a received packet
    fn release(&mut self, msg: Self::Message, verdict: Verdict) -> Result<()>;

    /// Detach from the queue
    fn close(&mut self) -> Result<()>;
}
