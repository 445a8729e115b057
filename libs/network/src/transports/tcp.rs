//! TCP Network Transport Helpers
//!
//! Socket setup shared by the collector's listener and the device simulator.
//! Telemetry frames are small and latency matters more than batching, so
//! every stream gets `TCP_NODELAY`.

use crate::{Result, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

/// Bind the listening socket
pub async fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;

    let local = listener.local_addr().unwrap_or(addr);
    info!("TCP server listening on {}", local);
    Ok(listener)
}

/// Apply per-stream socket options; failures are logged, never fatal
pub fn configure_stream(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    }
}

/// Connect to a remote collector with a deadline
pub async fn connect_with_timeout(addr: SocketAddr, limit: Duration) -> Result<TcpStream> {
    let stream = tokio::time::timeout(limit, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::timeout("TCP connect", limit))?
        .map_err(|e| TransportError::connection("Failed to connect to TCP peer", addr, e))?;

    configure_stream(&stream);
    Ok(stream)
}
