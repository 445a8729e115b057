//! # Meter Configuration
//!
//! Centralized configuration and defaults for the collector service and the
//! device simulator.
//!
//! ## Layering
//!
//! Later layers override earlier ones:
//!
//! 1. Built-in defaults (see [`service`])
//! 2. Optional TOML file (`--config path.toml`)
//! 3. Environment variables: `METER_COLLECTOR__LISTEN__PORT=9600`,
//!    `METER_SIMULATOR__DEVICES__COUNT=50`
//! 4. Command-line flags, applied by the binaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meter_config::CollectorConfig;
//!
//! let config = CollectorConfig::load(None)?;
//! let addr = config.listen_addr()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    config_source, CollectorConfig, DeviceConfig, LimitsConfig,
    ListenConfig, LoggingConfig, OutputConfig, ReconnectConfig, SimulatorConfig, TargetConfig,
};
