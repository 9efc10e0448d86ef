//! NFQUEUE backend
//!
//! Wraps the `nfq` crate. The socket is non-blocking; an empty queue is
//! reported as `Ok(None)` so the worker loop can observe shutdown.

use crate::error::{PlatformError, Result};
use crate::traits::{PacketQueue, QueuedPacket};
use nfq::{Message, Queue};
use std::io;
use tracing::{info, warn};
use whydpi_core::Verdict;

/// A bound netfilter queue
pub struct NfQueue {
    queue: Queue,
    queue_id: u16,
    bound: bool,
}

impl NfQueue {
    /// Open the netlink socket and bind to `queue_id`
    pub fn bind(queue_id: u16) -> Result<Self> {
        let mut queue = Queue::open().map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                PlatformError::PermissionDenied(format!("open netfilter queue: requires root ({e})"))
            } else {
                PlatformError::QueueOpen(e.to_string())
            }
        })?;

        queue.bind(queue_id).map_err(|e| PlatformError::QueueBind {
            queue: queue_id,
            message: e.to_string(),
        })?;
        queue.set_nonblocking(true);

        info!(queue = queue_id, "Bound to NFQUEUE");
        Ok(Self {
            queue,
            queue_id,
            bound: true,
        })
    }

    /// Queue number this handle is bound to
    pub fn queue_id(&self) -> u16 {
        self.queue_id
    }
}

/// A packet received from NFQUEUE
pub struct NfMessage(Message);

impl QueuedPacket for NfMessage {
    fn payload(&self) -> &[u8] {
        self.0.get_payload()
    }
}

impl PacketQueue for NfQueue {
    type Message = NfMessage;

    fn recv(&mut self) -> Result<Option<NfMessage>> {
        match self.queue.recv() {
            Ok(msg) => Ok(Some(NfMessage(msg))),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOBUFS) => {
                warn!("NFQUEUE receive buffer overrun, kernel dropped messages");
                Ok(None)
            }
            Err(e) => Err(PlatformError::Queue(format!("recv: {e}"))),
        }
    }

    fn release(&mut self, msg: NfMessage, verdict: Verdict) -> Result<()> {
        let mut msg = msg.0;
        msg.set_verdict(match verdict {
            Verdict::Accept => nfq::Verdict::Accept,
        });
        self.queue
            .verdict(msg)
            .map_err(|e| PlatformError::Queue(format!("verdict: {e}")))
    }

    fn close(&mut self) -> Result<()> {
        if !self.bound {
            return Ok(());
        }
        self.bound = false;
        self.queue
            .unbind(self.queue_id)
            .map_err(|e| PlatformError::Queue(format!("unbind: {e}")))?;
        info!(queue = self.queue_id, "Unbound from NFQUEUE");
        Ok(())
    }
}
