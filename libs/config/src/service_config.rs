//! Service Configuration Module
//!
//! Configuration structures for the collector service and the device
//! simulator, loaded from defaults, an optional TOML file and environment
//! variables.

use crate::service::{collector, logging, simulator};
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Collector service configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub listen: ListenConfig,
    pub output: OutputConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

/// Listening endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Record log settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only log file; `~` and `$VARS` are expanded
    pub path: PathBuf,
    /// Header row override; the standard column names are used when unset
    pub header: Option<String>,
    /// Pending appends buffered in front of the log writer
    pub queue_capacity: usize,
}

/// Resource limits for accepted connections
///
/// Both the connection cap and the idle timeout are off by default, which
/// keeps the one-task-per-connection policy unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum connections served concurrently; extra connections wait
    pub max_connections: Option<usize>,
    /// Close a connection that sends nothing for this long
    pub idle_timeout_secs: Option<u64>,
    pub read_buffer_size: usize,
    /// Grace period for in-flight connections on shutdown
    pub drain_timeout_secs: u64,
}

/// Logging settings shared by both binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `meter_collector=debug,warn`
    pub level: String,
    pub json: bool,
}

/// Device simulator configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub target: TargetConfig,
    pub devices: DeviceConfig,
    pub reconnect: ReconnectConfig,
    pub logging: LoggingConfig,
}

/// Collector the simulated devices report to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
}

/// Simulated device fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub count: u32,
    pub first_device_id: u32,
    pub send_interval_ms: u64,
}

/// Reconnect policy: fixed delay, unbounded retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub delay_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: collector::DEFAULT_HOST.to_string(),
            port: collector::DEFAULT_PORT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(collector::DEFAULT_OUTPUT_FILE),
            header: None,
            queue_capacity: collector::SINK_QUEUE_CAPACITY,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: None,
            idle_timeout_secs: None,
            read_buffer_size: collector::READ_BUFFER_SIZE,
            drain_timeout_secs: collector::DRAIN_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LEVEL.to_string(),
            json: false,
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: simulator::DEFAULT_TARGET_HOST.to_string(),
            port: collector::DEFAULT_PORT,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            count: simulator::DEFAULT_DEVICE_COUNT,
            first_device_id: simulator::DEFAULT_FIRST_DEVICE_ID,
            send_interval_ms: simulator::SEND_INTERVAL_MS,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_secs: simulator::RECONNECT_DELAY_SECS,
            connect_timeout_secs: simulator::CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Build a config from an optional file plus `PREFIX__SECTION__KEY` variables
fn load_layered<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        debug!("Loading configuration file: {:?}", path);
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build().context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Resolve `host:port`, accepting either an IP literal or a hostname
fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {}:{}", host, port))?
        .next()
        .with_context(|| format!("No address found for {}:{}", host, port))
}

impl CollectorConfig {
    /// Load configuration with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Self = load_layered(path, collector::ENV_PREFIX)?;
        config.expand_env_vars()?;
        config.validate()?;
        debug!("Collector configuration: {:?}", config);
        Ok(config)
    }

    /// Expand `~` and environment variables in the output path
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let raw = self.output.path.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw).context("Failed to expand output path")?;
        self.output.path = PathBuf::from(expanded.as_ref());
        Ok(())
    }

    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.output.path.as_os_str().is_empty() {
            bail!("output.path must not be empty");
        }
        if self.output.queue_capacity == 0 {
            bail!("output.queue_capacity must be at least 1");
        }
        if self.limits.max_connections == Some(0) {
            bail!("limits.max_connections must be at least 1 when set");
        }
        if self.limits.idle_timeout_secs == Some(0) {
            bail!("limits.idle_timeout_secs must be at least 1 when set");
        }
        if self.limits.read_buffer_size == 0 {
            bail!("limits.read_buffer_size must be at least 1");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        resolve(&self.listen.host, self.listen.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.limits.idle_timeout_secs.map(Duration::from_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.drain_timeout_secs)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

impl SimulatorConfig {
    /// Load configuration with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = load_layered(path, simulator::ENV_PREFIX)?;
        config.validate()?;
        debug!("Simulator configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.devices.count == 0 {
            bail!("devices.count must be at least 1");
        }
        if self.devices.send_interval_ms == 0 {
            bail!("devices.send_interval_ms must be at least 1");
        }
        if self
            .devices
            .first_device_id
            .checked_add(self.devices.count - 1)
            .is_none()
        {
            bail!("device ids starting at {} overflow u32", self.devices.first_device_id);
        }
        Ok(())
    }

    pub fn target_addr(&self) -> Result<SocketAddr> {
        resolve(&self.target.host, self.target.port)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.devices.send_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect.delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.reconnect.connect_timeout_secs)
    }

    /// Ids of every simulated device, in start order
    pub fn device_ids(&self) -> impl Iterator<Item = u32> {
        let first = self.devices.first_device_id;
        (0..self.devices.count).map(move |offset| first + offset)
    }
}

/// Where a loaded configuration came from, for the startup log
pub fn config_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("{} + environment overrides", path.display()),
        None => "built-in defaults + environment overrides".to_string(),
    }
}
