//! Platform-specific errors

use thiserror::Error;
use whydpi_core::RouteError;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The packet queue could not be opened
    #[error("Failed to open packet queue: {0}")]
    QueueOpen(String),

    /// Binding to the queue number failed
    #[error("Failed to bind queue {queue}: {message}")]
    QueueBind {
        /// Queue number
        queue: u16,
        /// Error message
        message: String,
    },

    /// Receiving or releasing a queued packet failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Raw socket setup failed
    #[error("Socket error: {0}")]
    Socket(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A firewall command failed
    #[error("iptables {command} failed: {stderr}")]
    Firewall {
        /// Arguments passed to iptables
        command: String,
        /// Captured error output
        stderr: String,
    },

    /// DNS reconfiguration failed
    #[error("DNS configuration error: {0}")]
    Dns(String),

    /// Routing-table query failed
    #[error(transparent)]
    Route(#[from] RouteError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;
