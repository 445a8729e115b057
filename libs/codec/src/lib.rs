//! # Meter Telemetry Codec
//!
//! ## Purpose
//!
//! This crate contains the "Rules" layer of the collector:
//! - Encoding/decoding of the fixed 44-byte little-endian telemetry frame
//! - Reassembly of frame boundaries from an undelimited byte stream
//! - Protocol error types
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/network
//!     ↑           ↓            ↓
//! Pure Data   Wire Rules    Transport
//! MeterFrame  decode_frame  FrameReader
//! Record      StreamFramer  TcpStream
//! ```
//!
//! ## Wire Format
//!
//! ```text
//! offset  size  field
//! 0       4     device_id       u32 LE
//! 4       4     epoch_seconds   u32 LE (UTC unix time)
//! 8       4*3   current A/B/C   f32 LE
//! 20      4*3   voltage A/B/C   f32 LE
//! 32      4*3   power A/B/C     f32 LE
//! ```
//!
//! No length prefix, delimiter or checksum exists: the receiver relies on the
//! fixed size alone, which is why every transport read must pass through a
//! [`StreamFramer`] before decoding.
//!
//! ## What This Crate Does NOT Contain
//! - Socket handling or read loops (belongs in network/)
//! - Persistence of decoded records (belongs in record_sink/)

pub mod error;
pub mod frame;
pub mod framer;

pub use error::{ProtocolError, ProtocolResult};
pub use frame::{decode_frame, encode_frame, encode_into, encode_record, parse_frame};
pub use framer::{StreamFramer, TruncatedFrame};
pub use meter_types::FRAME_SIZE;
