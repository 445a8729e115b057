//! Network Infrastructure
//!
//! Transport-side building blocks for the collector and the device simulator:
//! a frame reader that sits between raw socket reads and frame decoding, TCP
//! socket setup helpers, the stop signal every connection task watches, and
//! the transport error type.

pub mod error;
pub mod shutdown;
pub mod transports;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use shutdown::{stop_flag, stop_requested};
pub use transports::{
    bind_listener, configure_stream, connect_with_timeout, FrameEvent, FrameReader, ReadStats,
};

// Constants for configuration
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024; // 4KB
