//! Transport Layer
//!
//! - [`tcp`]: socket setup for listeners and outbound device connections
//! - [`frame_reader`]: reassembles frames from any `AsyncRead` byte stream

pub mod frame_reader;
pub mod tcp;

pub use frame_reader::{FrameEvent, FrameReader, ReadStats};
pub use tcp::{bind_listener, configure_stream, connect_with_timeout};
