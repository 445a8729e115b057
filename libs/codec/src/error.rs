//! Protocol-level errors for frame processing

use meter_types::FRAME_SIZE;
use thiserror::Error;

/// Frame decoding errors
///
/// Numeric reinterpretation of any 44 bytes always succeeds, so the only
/// failure mode is a buffer of the wrong size.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input buffer is not exactly one frame long
    #[error("Frame length error: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },
}

impl ProtocolError {
    /// Create a frame length error for a buffer of `actual` bytes
    pub fn frame_length(actual: usize) -> Self {
        Self::FrameLength {
            expected: FRAME_SIZE,
            actual,
        }
    }

    /// Length of the rejected buffer
    pub fn actual_length(&self) -> usize {
        match self {
            Self::FrameLength { actual, .. } => *actual,
        }
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
