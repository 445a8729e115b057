//! Per-connection lifecycle
//!
//! ```text
//! Accepted ──run()──→ Reading ──peer close / read error / idle timeout / shutdown──→ Closed
//! ```
//!
//! While `Reading`, the handler suspends only on transport reads. Each frame
//! is decoded and appended before the next one is pulled, so records from one
//! device reach the log in arrival order.

use meter_codec::decode_frame;
use meter_network::{stop_requested, FrameEvent, FrameReader, TransportError};
use record_sink::RecordSink;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle state of one device connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Reading,
    Closed,
}

/// Why a connection left the `Reading` state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Orderly close by the device
    PeerClosed,
    /// No bytes arrived within the configured idle timeout
    IdleTimeout,
    /// Read failure on the socket
    TransportError(String),
    /// The server stopped before the device disconnected
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::IdleTimeout => write!(f, "idle timeout"),
            CloseReason::TransportError(e) => write!(f, "transport error: {}", e),
            CloseReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// What happened on one connection, returned when it closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub peer: SocketAddr,
    /// Complete frames pulled from the stream
    pub frames: u64,
    pub records_written: u64,
    pub decode_failures: u64,
    pub sink_failures: u64,
    pub bytes_received: u64,
    /// Bytes of a partial frame discarded at close, whatever ended the connection
    pub truncated_bytes: Option<usize>,
    pub close_reason: CloseReason,
}

impl ConnectionSummary {
    pub fn new(peer: SocketAddr, close_reason: CloseReason) -> Self {
        Self {
            peer,
            frames: 0,
            records_written: 0,
            decode_failures: 0,
            sink_failures: 0,
            bytes_received: 0,
            truncated_bytes: None,
            close_reason,
        }
    }

    /// Closed without any record being produced or lost
    pub fn is_clean_empty(&self) -> bool {
        self.frames == 0 && self.truncated_bytes.is_none() && self.close_reason == CloseReason::PeerClosed
    }
}

/// Owns one device connection from accept to close
pub struct ConnectionHandler<R> {
    peer: SocketAddr,
    reader: FrameReader<R>,
    sink: Arc<dyn RecordSink>,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
    summary: ConnectionSummary,
}

impl<R: AsyncRead + Unpin> ConnectionHandler<R> {
    /// Handler in the `Accepted` state; it never observes a shutdown signal
    /// unless one is attached with [`with_shutdown`](Self::with_shutdown).
    pub fn new(peer: SocketAddr, reader: FrameReader<R>, sink: Arc<dyn RecordSink>) -> Self {
        // Sender dropped right away: the receiver never reports a stop
        let (_, shutdown) = watch::channel(false);

        Self {
            peer,
            reader,
            sink,
            shutdown,
            state: ConnectionState::Accepted,
            summary: ConnectionSummary::new(peer, CloseReason::PeerClosed),
        }
    }

    /// Stop reading once `shutdown` turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Read frames until the connection ends
    #[instrument(name = "connection", skip_all, fields(peer = %self.peer))]
    pub async fn run(mut self) -> ConnectionSummary {
        self.transition(ConnectionState::Reading);
        info!("📡 Device connected from {}", self.peer);

        let reason = loop {
            let event = tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown) => break CloseReason::Shutdown,
                event = self.reader.next_event() => event,
            };

            match event {
                Ok(FrameEvent::Frame(frame)) => self.process_frame(&frame).await,
                Ok(FrameEvent::EndOfStream { truncated }) => {
                    if let Some(truncated) = truncated {
                        warn!("⚠️ {} from {}", truncated, self.peer);
                        self.summary.truncated_bytes = Some(truncated.remainder);
                    }
                    break CloseReason::PeerClosed;
                }
                Err(e) if e.is_timeout() => {
                    warn!("⏱️ {} idle, closing: {}", self.peer, e);
                    break CloseReason::IdleTimeout;
                }
                Err(e) => {
                    error!("Connection error from {}: {}", self.peer, e);
                    break CloseReason::TransportError(describe(&e));
                }
            }
        };

        if reason != CloseReason::PeerClosed {
            self.flush_buffered(&reason).await;
        }
        self.close(reason)
    }

    /// Record every complete frame still held by the reader, then account
    /// for the partial frame that can no longer be completed
    async fn flush_buffered(&mut self, reason: &CloseReason) {
        while let Some(frame) = self.reader.next_buffered() {
            self.process_frame(&frame).await;
        }

        let remainder = self.reader.buffered();
        if remainder > 0 {
            warn!(
                "⚠️ Discarding {} bytes of an incomplete frame from {} ({})",
                remainder, self.peer, reason
            );
            self.summary.truncated_bytes = Some(remainder);
        }
    }

    async fn process_frame(&mut self, frame: &[u8]) {
        self.summary.frames += 1;

        let record = match decode_frame(frame) {
            Ok(record) => record,
            Err(e) => {
                self.summary.decode_failures += 1;
                warn!("⚠️ Dropping undecodable frame from {}: {}", self.peer, e);
                return;
            }
        };

        match self.sink.append(&record).await {
            Ok(()) => {
                self.summary.records_written += 1;
                info!(
                    device_id = record.device_id(),
                    "✅ Saved record from device {} reported at {}",
                    record.device_id(),
                    record.report_time()
                );
            }
            Err(e) => {
                self.summary.sink_failures += 1;
                error!(
                    device_id = record.device_id(),
                    "❌ Failed to save record from device {}: {}",
                    record.device_id(),
                    e
                );
            }
        }
    }

    fn close(mut self, reason: CloseReason) -> ConnectionSummary {
        let stats = self.reader.stats();
        self.summary.bytes_received = stats.bytes_received;
        self.summary.close_reason = reason;
        self.transition(ConnectionState::Closed);

        info!(
            frames = self.summary.frames,
            records = self.summary.records_written,
            bytes = stats.bytes_received,
            "🔌 Device {} disconnected ({})",
            self.peer,
            self.summary.close_reason
        );

        // Socket and frame buffer are released here
        self.summary
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("Connection state {:?} → {:?}", self.state, next);
        self.state = next;
    }
}

fn describe(error: &TransportError) -> String {
    match error {
        TransportError::Io { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
