//! Device simulator entry point

use anyhow::{Context, Result};
use clap::Parser;
use meter_config::{config_source, LoggingConfig, SimulatorConfig};
use meter_simulator::run_fleet;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Simulates metering devices pushing telemetry frames", long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector host
    #[arg(long)]
    host: Option<String>,

    /// Collector port
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of simulated devices
    #[arg(short, long)]
    devices: Option<u32>,

    /// Id of the first device; the rest count up from it
    #[arg(long)]
    first_device_id: Option<u32>,

    /// Milliseconds between frames of one device
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seconds to wait before reconnecting after a failure
    #[arg(long)]
    reconnect_delay_secs: Option<u64>,

    /// Log filter, e.g. `info` or `meter_simulator=debug`
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut SimulatorConfig) -> Result<()> {
        if let Some(host) = self.host {
            config.target.host = host;
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(count) = self.devices {
            config.devices.count = count;
        }
        if let Some(first) = self.first_device_id {
            config.devices.first_device_id = first;
        }
        if let Some(interval) = self.interval_ms {
            config.devices.send_interval_ms = interval;
        }
        if let Some(delay) = self.reconnect_delay_secs {
            config.reconnect.delay_secs = delay;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        config.validate()
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(logging.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!logging.json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();

    let mut config = SimulatorConfig::load(args.config.as_deref())
        .context("Failed to load simulator configuration")?;
    args.apply(&mut config)?;

    init_tracing(&config.logging);
    info!("Starting device simulator v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration: {}", config_source(config_path.as_deref()));

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = stop.send(true);
            }
            // Devices keep running; dropping the sender never signals a stop
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let report = run_fleet(&config, shutdown).await?;
    info!(
        "Simulation finished: {} frames sent, {} connection failures",
        report.frames_sent(),
        report.failures()
    );

    Ok(())
}
