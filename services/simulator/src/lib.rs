//! # Meter Device Simulator
//!
//! ## Purpose
//!
//! Stands in for a fleet of field devices. Each simulated device keeps one
//! TCP connection to the collector and pushes one randomly generated frame
//! per send interval.
//!
//! ## Architecture Role
//!
//! ```text
//! [DeviceSimulator 1000] ─┐
//! [DeviceSimulator 1001] ─┼─ 44-byte frames ─→ meter_collector :9527
//! [DeviceSimulator ....] ─┘
//!        ↺ fixed-delay reconnect on any connect/send failure, unbounded retries
//! ```

pub mod device;
pub mod error;
pub mod generator;

pub use device::{run_fleet, DeviceSimulator, DeviceStats, FleetReport};
pub use error::SimulatorError;
pub use generator::{current_epoch_seconds, generate_frame};
