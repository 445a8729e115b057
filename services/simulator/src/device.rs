//! Simulated device connection loop
//!
//! Each device runs `connect → send every interval → (failure) → sleep → connect`
//! until the shutdown signal turns `true`. Failures never end the loop.

use crate::error::SimulatorError;
use crate::generator::{current_epoch_seconds, generate_frame};
use anyhow::Result;
use meter_codec::encode_frame;
use meter_config::SimulatorConfig;
use meter_network::{connect_with_timeout, stop_flag, stop_requested};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

/// Counters for one simulated device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub device_id: u32,
    /// Successful connects
    pub connections: u64,
    pub frames_sent: u64,
    /// Connect or send failures, each followed by a reconnect delay
    pub failures: u64,
}

/// One simulated metering device
#[derive(Debug)]
pub struct DeviceSimulator {
    device_id: u32,
    target: SocketAddr,
    send_interval: Duration,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    rng: StdRng,
    stats: DeviceStats,
}

impl DeviceSimulator {
    pub fn new(device_id: u32, target: SocketAddr) -> Self {
        let defaults = SimulatorConfig::default();
        Self {
            device_id,
            target,
            send_interval: defaults.send_interval(),
            reconnect_delay: defaults.reconnect_delay(),
            connect_timeout: defaults.connect_timeout(),
            rng: StdRng::from_entropy(),
            stats: DeviceStats {
                device_id,
                ..DeviceStats::default()
            },
        }
    }

    /// Device with the timing of `config`
    pub fn from_config(device_id: u32, target: SocketAddr, config: &SimulatorConfig) -> Self {
        Self::new(device_id, target)
            .with_send_interval(config.send_interval())
            .with_reconnect_delay(config.reconnect_delay())
            .with_connect_timeout(config.connect_timeout())
    }

    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = limit;
        self
    }

    /// Reproducible readings
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Push frames until `shutdown` turns `true`, reconnecting without bound
    #[instrument(name = "device", skip_all, fields(device_id = self.device_id))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DeviceStats {
        while !stop_flag(&shutdown) {
            let failure = match self.session(&mut shutdown).await {
                Ok(()) => break,
                Err(e) => e,
            };

            self.stats.failures += 1;
            warn!(
                "⚠️ {}. Reconnecting in {:?}...",
                failure, self.reconnect_delay
            );

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        debug!(
            frames = self.stats.frames_sent,
            failures = self.stats.failures,
            "Device {} stopped",
            self.device_id
        );
        self.stats
    }

    /// One connection: returns `Ok` only when shutdown was requested
    async fn session(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<(), SimulatorError> {
        let mut stream = connect_with_timeout(self.target, self.connect_timeout)
            .await
            .map_err(|source| SimulatorError::Connect {
                device_id: self.device_id,
                target: self.target,
                source,
            })?;

        self.stats.connections += 1;
        info!("📡 Device {} connected to {}", self.device_id, self.target);

        let mut ticker = tokio::time::interval(self.send_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_requested(shutdown) => {
                    let _ = stream.shutdown().await;
                    return Ok(());
                }
                _ = ticker.tick() => self.send_frame(&mut stream).await?,
            }
        }
    }

    async fn send_frame(&mut self, stream: &mut TcpStream) -> Result<(), SimulatorError> {
        let frame = generate_frame(self.device_id, current_epoch_seconds(), &mut self.rng);

        stream
            .write_all(&encode_frame(&frame))
            .await
            .map_err(|source| SimulatorError::Send {
                device_id: self.device_id,
                source,
            })?;

        self.stats.frames_sent += 1;
        debug!("Device {} sent frame #{}", self.device_id, self.stats.frames_sent);
        Ok(())
    }
}

/// Outcome of a whole fleet run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetReport {
    pub devices: Vec<DeviceStats>,
}

impl FleetReport {
    pub fn frames_sent(&self) -> u64 {
        self.devices.iter().map(|d| d.frames_sent).sum()
    }

    pub fn failures(&self) -> u64 {
        self.devices.iter().map(|d| d.failures).sum()
    }
}

/// Run every configured device, one task each, until `shutdown` turns `true`
pub async fn run_fleet(config: &SimulatorConfig, shutdown: watch::Receiver<bool>) -> Result<FleetReport> {
    config.validate()?;
    let target = config.target_addr()?;

    info!(
        "🚀 Starting {} simulated devices (ids {}..) against {}",
        config.devices.count, config.devices.first_device_id, target
    );

    let mut devices = JoinSet::new();
    for device_id in config.device_ids() {
        let device = DeviceSimulator::from_config(device_id, target, config);
        devices.spawn(device.run(shutdown.clone()));
    }
    info!("✅ All devices started");

    let mut report = FleetReport::default();
    while let Some(joined) = devices.join_next().await {
        match joined {
            Ok(stats) => report.devices.push(stats),
            Err(e) => error!("Device task failed: {}", e),
        }
    }
    report.devices.sort_by_key(|d| d.device_id);

    Ok(report)
}
