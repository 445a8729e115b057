//! Simulator error types
//!
//! Neither variant is fatal: the device logs it, waits the reconnect delay
//! and tries again.

use meter_network::TransportError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulatorError {
    /// Could not reach the collector
    #[error("Device {device_id} failed to connect to {target}: {source}")]
    Connect {
        device_id: u32,
        target: SocketAddr,
        source: TransportError,
    },

    /// Connection dropped while pushing a frame
    #[error("Device {device_id} failed to send frame: {source}")]
    Send {
        device_id: u32,
        source: std::io::Error,
    },
}

impl SimulatorError {
    pub fn device_id(&self) -> u32 {
        match self {
            SimulatorError::Connect { device_id, .. } | SimulatorError::Send { device_id, .. } => {
                *device_id
            }
        }
    }
}
