//! Meter collector entry point

use anyhow::{Context, Result};
use clap::Parser;
use meter_collector::CollectorServer;
use meter_config::{config_source, CollectorConfig, LoggingConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Collects meter telemetry frames into a CSV record log", long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening host or address
    #[arg(long)]
    host: Option<String>,

    /// Listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Record log file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum connections served concurrently
    #[arg(long)]
    max_connections: Option<usize>,

    /// Close connections idle for this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Log filter, e.g. `info` or `meter_collector=debug`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(self, config: &mut CollectorConfig) -> Result<()> {
        if let Some(host) = self.host {
            config.listen.host = host;
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(output) = self.output {
            config.output.path = output;
            config.expand_env_vars()?;
        }
        if self.max_connections.is_some() {
            config.limits.max_connections = self.max_connections;
        }
        if self.idle_timeout_secs.is_some() {
            config.limits.idle_timeout_secs = self.idle_timeout_secs;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.json_logs {
            config.logging.json = true;
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
    let print_config = args.print_config;
    let config_path = args.config.clone();

    let mut config = CollectorConfig::load(args.config.as_deref())
        .context("Failed to load collector configuration")?;
    args.apply(&mut config)?;

    if print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.logging);
    info!("Starting meter collector v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration: {}", config_source(config_path.as_deref()));
    info!(
        "Listening on {}:{}, recording to {}",
        config.listen.host,
        config.listen.port,
        config.output.path.display()
    );

    let server = CollectorServer::bind(&config).await?;

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    let report = server.run_until(shutdown).await?;
    info!(
        "Served {} connections, {} records, {} truncated frames",
        report.connections_accepted, report.records_written, report.truncated_frames
    );

    Ok(())
}
