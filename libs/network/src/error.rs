//! Transport Error Types
//!
//! Socket-level failures. A read error or timeout ends the affected
//! connection; a bind or accept error is fatal to the listener.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Main transport error type
#[derive(Error, Debug)]
pub enum TransportError {
    /// Read/write failure on an established connection
    #[error("I/O error: {message}: {source}")]
    Io {
        message: String,
        source: std::io::Error,
    },

    /// Outbound connection could not be established
    #[error("Connection error: {message} (remote: {remote_addr}): {source}")]
    Connection {
        message: String,
        remote_addr: SocketAddr,
        source: std::io::Error,
    },

    /// Listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Listening socket failed to accept
    #[error("Failed to accept connection: {source}")]
    Accept { source: std::io::Error },

    /// Operation exceeded its deadline
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a connection error
    pub fn connection(
        message: impl Into<String>,
        remote_addr: SocketAddr,
        source: std::io::Error,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            remote_addr,
            source,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: limit.as_millis() as u64,
        }
    }

    /// Whether this error came from an expired deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
