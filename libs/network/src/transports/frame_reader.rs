//! # Frame Reader
//!
//! ## Purpose
//!
//! Mandatory reassembly layer between raw transport reads and frame decoding.
//! Wraps any `AsyncRead` (a `TcpStream` in production, scripted mocks in
//! tests) and yields a lazy, finite sequence of exactly-44-byte frames,
//! however the transport fragments or coalesces them.
//!
//! ## Sequence Semantics
//!
//! ```text
//! next_event() → Frame(44 bytes)   one per complete frame, in arrival order
//!              → EndOfStream { truncated: None }            clean close
//!              → EndOfStream { truncated: Some(remainder) } closed mid-frame
//!              → Err(TransportError)                        read error / idle timeout
//! ```
//!
//! After `EndOfStream` the reader stays exhausted. A reader owns its buffer
//! exclusively; one reader per connection.

use crate::{Result, TransportError, DEFAULT_READ_BUFFER_SIZE};
use bytes::Bytes;
use meter_codec::{StreamFramer, TruncatedFrame};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// One step of the frame sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete frame, ready for decoding
    Frame(Bytes),
    /// Peer closed the stream
    EndOfStream { truncated: Option<TruncatedFrame> },
}

/// Read statistics for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub reads: u64,
    pub bytes_received: u64,
    pub frames_emitted: u64,
}

/// Frame-at-a-time reader over a byte stream
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    framer: StreamFramer,
    read_buffer: Vec<u8>,
    idle_timeout: Option<Duration>,
    stats: ReadStats,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: StreamFramer::new(),
            read_buffer: vec![0u8; DEFAULT_READ_BUFFER_SIZE],
            idle_timeout: None,
            stats: ReadStats::default(),
            exhausted: false,
        }
    }

    /// Fail a read that sees no bytes for `limit`
    pub fn with_idle_timeout(mut self, limit: Option<Duration>) -> Self {
        self.idle_timeout = limit;
        self
    }

    /// Size of the scratch buffer handed to each transport read
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer = vec![0u8; size.max(1)];
        self
    }

    /// Advance the sequence by one event
    pub async fn next_event(&mut self) -> Result<FrameEvent> {
        loop {
            if let Some(frame) = self.framer.next_frame() {
                self.stats.frames_emitted += 1;
                return Ok(FrameEvent::Frame(frame));
            }
            if self.exhausted {
                return Ok(FrameEvent::EndOfStream { truncated: None });
            }

            let n = self.read_chunk().await?;
            if n == 0 {
                self.exhausted = true;
                return Ok(FrameEvent::EndOfStream {
                    truncated: self.framer.finish(),
                });
            }

            self.stats.reads += 1;
            self.stats.bytes_received += n as u64;
            self.framer.push(&self.read_buffer[..n]);
            trace!(
                bytes = n,
                buffered = self.framer.buffered(),
                "Read chunk from transport"
            );
        }
    }

    async fn read_chunk(&mut self) -> Result<usize> {
        let read = self.reader.read(&mut self.read_buffer);
        let outcome = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| TransportError::timeout("frame read", limit))?,
            None => read.await,
        };
        outcome.map_err(|e| TransportError::io("Failed to read from device connection", e))
    }

    /// Pop a complete frame already buffered, without touching the transport
    pub fn next_buffered(&mut self) -> Option<Bytes> {
        let frame = self.framer.next_frame()?;
        self.stats.frames_emitted += 1;
        Some(frame)
    }

    /// Bytes of a partial frame currently held back
    pub fn buffered(&self) -> usize {
        self.framer.buffered()
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Whether end of stream has been observed
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
