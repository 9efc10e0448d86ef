//! Worker loop
//!
//! Receive, dispatch, release, strictly in that order, so any decoy leaves
//! before the real packet's verdict.

use crate::traits::{PacketQueue, QueuedPacket};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use whydpi_core::Dispatcher;

/// Wait between polls of an empty queue
pub const IDLE_POLL: Duration = Duration::from_millis(1);

/// Drive `queue` through `dispatcher` until `running` is cleared
///
/// Returns the number of packets handled. The queue is closed on the way
/// out, whether the loop ended normally or on a receive error.
pub fn serve<Q: PacketQueue>(
    queue: &mut Q,
    dispatcher: &Dispatcher,
    running: &AtomicBool,
) -> Result<u64> {
    let result = run(queue, dispatcher, running);

    if let Err(e) = queue.close() {
        warn!(error = %e, "Failed to close packet queue");
    }

    if let Ok(handled) = &result {
        info!(handled, "Packet loop stopped");
    }
    result
}

fn run<Q: PacketQueue>(queue: &mut Q, dispatcher: &Dispatcher, running: &AtomicBool) -> Result<u64> {
    let mut handled = 0u64;

    while running.load(Ordering::SeqCst) {
        let Some(msg) = queue.recv()? else {
            std::thread::sleep(IDLE_POLL);
            continue;
        };

        let verdict = dispatcher.handle(msg.payload());
        if let Err(e) = queue.release(msg, verdict) {
            warn!(error = %e, "Failed to issue verdict");
        }
        handled += 1;
    }

    Ok(handled)
}
