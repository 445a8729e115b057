//! Core E2E testing framework

use anyhow::{bail, Context, Result};
use meter_collector::{CollectorServer, ServerReport};
use meter_config::CollectorConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

static LOGGING: Once = Once::new();

/// Install a test subscriber once per process; honours `RUST_LOG`
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A collector running on `127.0.0.1:<ephemeral>` with a private log file
pub struct TestCollector {
    addr: SocketAddr,
    log_path: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<ServerReport>>>,
    _dir: TempDir,
}

impl TestCollector {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Start with default settings adjusted by `customize`
    pub async fn start_with(customize: impl FnOnce(&mut CollectorConfig)) -> Result<Self> {
        init_test_logging();

        let dir = TempDir::new().context("Failed to create test directory")?;
        let mut config = CollectorConfig::default();
        config.listen.host = "127.0.0.1".to_string();
        config.listen.port = 0;
        config.output.path = dir.path().join("data_log.csv");
        config.limits.drain_timeout_secs = 1;
        customize(&mut config);
        config.validate()?;

        let server = CollectorServer::bind(&config).await?;
        let addr = server.local_addr()?;
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = stopped.await;
        }));

        info!("Test collector listening on {}", addr);
        Ok(Self {
            addr,
            log_path: config.output.path,
            stop: Some(stop),
            task: Some(task),
            _dir: dir,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Open a raw device connection
    pub async fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect(self.addr)
            .await
            .with_context(|| format!("Failed to connect to {}", self.addr))
    }

    /// Current log contents, one entry per line, header included
    pub async fn log_lines(&self) -> Result<Vec<String>> {
        let contents = tokio::fs::read_to_string(&self.log_path)
            .await
            .with_context(|| format!("Failed to read {}", self.log_path.display()))?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Poll until the log holds `count` records (header excluded)
    pub async fn wait_for_records(&self, count: usize, limit: Duration) -> Result<Vec<String>> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let lines = self.log_lines().await?;
            let records = lines.len().saturating_sub(1);
            if records >= count {
                return Ok(lines);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("Timed out waiting for {} records, log has {}", count, records);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Stop accepting, drain connections and close the log
    pub async fn shutdown(mut self) -> Result<ServerReport> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.task.take() {
            Some(task) => task.await.context("Collector task panicked")?,
            None => bail!("Collector already shut down"),
        }
    }
}

impl Drop for TestCollector {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
