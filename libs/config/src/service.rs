//! Service configuration defaults
//!
//! Default values shared by the config structs, the binaries' CLI help and
//! the tests.

/// Collector service defaults
pub mod collector {
    /// Listen on all interfaces
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Port the metering devices are provisioned with
    pub const DEFAULT_PORT: u16 = 9527;

    /// Record log written in the working directory
    pub const DEFAULT_OUTPUT_FILE: &str = "data_log.csv";

    /// Pending appends buffered in front of the single log writer
    pub const SINK_QUEUE_CAPACITY: usize = 1024;

    /// Scratch buffer per connection read
    pub const READ_BUFFER_SIZE: usize = 4 * 1024;

    /// Grace period for in-flight connections on shutdown (seconds)
    pub const DRAIN_TIMEOUT_SECS: u64 = 5;

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "METER_COLLECTOR";
}

/// Device simulator defaults
pub mod simulator {
    pub const DEFAULT_TARGET_HOST: &str = "127.0.0.1";

    /// Number of simulated devices
    pub const DEFAULT_DEVICE_COUNT: u32 = 10;

    /// Id of the first simulated device; the rest count up from here
    pub const DEFAULT_FIRST_DEVICE_ID: u32 = 1000;

    /// One frame per device per second
    pub const SEND_INTERVAL_MS: u64 = 1_000;

    /// Fixed delay before reconnecting after any failure (seconds)
    pub const RECONNECT_DELAY_SECS: u64 = 3;

    /// Connect timeout (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 5;

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "METER_SIMULATOR";
}

/// Logging defaults
pub mod logging {
    pub const DEFAULT_LEVEL: &str = "info";
}
