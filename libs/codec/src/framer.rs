//! # Stream Framer
//!
//! ## Purpose
//!
//! Turns an unbounded, boundary-less byte stream into exactly-44-byte frames.
//! A single transport read can return part of a frame, several frames, or
//! several frames plus a partial one; the framer absorbs all of these cases.
//!
//! ## Contract
//!
//! - Bytes are appended to a per-connection accumulator
//! - Every complete 44-byte prefix is emitted as one frame, in order
//! - The remainder stays buffered until the next chunk arrives
//! - A short frame is never emitted and no byte is ever dropped, except the
//!   trailing partial frame at end of stream, which [`StreamFramer::finish`]
//!   reports as a [`TruncatedFrame`]
//!
//! ```text
//! read #1: [ 30 bytes ]            → nothing, 30 buffered
//! read #2: [ 58 bytes ]            → frame 1, 44 buffered → frame 2, 0 buffered
//! read #3: [ 20 bytes ] then EOF   → TruncatedFrame { remainder: 20 }
//! ```

use bytes::{Bytes, BytesMut};
use meter_types::FRAME_SIZE;
use std::fmt;

/// Initial accumulator capacity, enough for a burst of coalesced frames
const DEFAULT_CAPACITY: usize = FRAME_SIZE * 32;

/// Partial frame left behind when the peer closed mid-frame
///
/// Non-fatal: the bytes are discarded and the connection closes normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedFrame {
    /// Number of bytes discarded (always `1..FRAME_SIZE`)
    pub remainder: usize,
}

impl fmt::Display for TruncatedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "connection closed mid-frame: discarded {} of {} bytes",
            self.remainder, FRAME_SIZE
        )
    }
}

/// Per-connection frame reassembly buffer
#[derive(Debug)]
pub struct StreamFramer {
    buffer: BytesMut,
    frames_emitted: u64,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity.max(FRAME_SIZE)),
            frames_emitted: 0,
        }
    }

    /// Append one transport chunk
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Split off the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Bytes> {
        if self.buffer.len() < FRAME_SIZE {
            return None;
        }
        self.frames_emitted += 1;
        Some(self.buffer.split_to(FRAME_SIZE).freeze())
    }

    /// Drain every complete frame currently buffered
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { framer: self }
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total frames emitted so far
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Whether a complete frame is ready to be taken
    pub fn has_frame(&self) -> bool {
        self.buffer.len() >= FRAME_SIZE
    }

    /// Signal end of stream
    ///
    /// Returns the truncation warning if a partial frame was still buffered.
    /// Complete frames must be drained before calling this; any left over are
    /// counted in the remainder as well.
    pub fn finish(&mut self) -> Option<TruncatedFrame> {
        let remainder = self.buffer.len();
        self.buffer.clear();
        (remainder > 0).then_some(TruncatedFrame { remainder })
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draining iterator over complete frames, see [`StreamFramer::frames`]
pub struct Frames<'a> {
    framer: &'a mut StreamFramer,
}

impl Iterator for Frames<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_frame()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let ready = self.framer.buffered() / FRAME_SIZE;
        (ready, Some(ready))
    }
}
