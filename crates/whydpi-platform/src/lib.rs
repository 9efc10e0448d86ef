//! whyDPI Platform Abstraction Layer
//!
//! This crate provides platform-specific packet delivery and injection.
//!
//! ## Supported Platforms
//!
//! - **Linux**: NFQUEUE with raw IPv4 sockets and iptables

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::{NfQueue, RawSocketSender};

// Platform-agnostic traits
mod traits;
pub use traits::{PacketQueue, QueuedPacket};

mod serve;
pub use serve::{serve, IDLE_POLL};
