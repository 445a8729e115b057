//! # Meter Telemetry Types
//!
//! Data model shared by every layer of the metering collector.
//!
//! ## Design Philosophy
//!
//! - **Raw vs. Display**: [`MeterFrame`] carries the exact wire values, [`Record`]
//!   carries the rounded, display-ready reading that lands in the log
//! - **Pure Data**: no I/O and no wire parsing here; byte layout rules live in
//!   `meter-codec`, sockets live in `meter-network`
//! - **Immutable Records**: a [`Record`] can only be produced from a frame and
//!   exposes read-only accessors
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/network → services/collector
//!     ↑             ↓              ↓               ↓
//! MeterFrame    44-byte LE     FrameReader     Handler → Sink
//! Record        encode/decode  over TcpStream  CSV log line
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use meter_types::{MeterFrame, PhaseValues, Record};
//!
//! let frame = MeterFrame {
//!     device_id: 7,
//!     epoch_seconds: 1_700_000_000,
//!     currents: PhaseValues::new(1.0, 2.0, 3.0),
//!     voltages: PhaseValues::new(220.0, 221.0, 222.0),
//!     active_power: PhaseValues::new(100.0, 200.0, 300.0),
//! };
//!
//! let record = Record::from_frame(&frame);
//! assert_eq!(
//!     record.to_csv_line(),
//!     "7,2023-11-14 22:13:20,1.0,2.0,3.0,220.0,221.0,222.0,100.0,200.0,300.0\n"
//! );
//! ```

pub mod constants;
pub mod frame;
pub mod precision;
pub mod record;

pub use constants::*;
pub use frame::{MeterFrame, PhaseValues};
pub use precision::{render_decimal, round_to_decimals};
pub use record::Record;
