//! # Collector Server
//!
//! ## Purpose
//!
//! Owns the listening socket and the record log. Accepts device connections
//! in a loop that never blocks on per-connection I/O and starts one
//! [`ConnectionHandler`] task per accepted socket.
//!
//! ## Shutdown Sequence
//!
//! ```text
//! shutdown future resolves
//!   → stop accepting, drop the listener
//!   → wait up to drain_timeout for connections to end on their own
//!   → signal remaining handlers to stop, wait for them
//!   → close the record log (pending appends are flushed)
//! ```
//!
//! Binding fails before anything is served. An accept failure is fatal: the
//! same drain and close run, then the error is returned to the caller.

use crate::connection::{CloseReason, ConnectionHandler, ConnectionSummary};
use anyhow::{Context, Result};
use meter_config::CollectorConfig;
use meter_network::{bind_listener, configure_stream, stop_requested, FrameReader, TransportError};
use record_sink::{CsvLogSink, RecordSink, SinkConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// How long stopped handlers get to unwind after the drain period
const FORCED_STOP_GRACE: Duration = Duration::from_secs(1);

/// Per-connection resource limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLimits {
    /// Connections served concurrently; `None` keeps the policy unbounded
    pub max_connections: Option<usize>,
    pub idle_timeout: Option<Duration>,
    pub read_buffer_size: usize,
    pub drain_timeout: Duration,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self::from(&CollectorConfig::default())
    }
}

impl From<&CollectorConfig> for ServerLimits {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            max_connections: config.limits.max_connections,
            idle_timeout: config.idle_timeout(),
            read_buffer_size: config.limits.read_buffer_size,
            drain_timeout: config.drain_timeout(),
        }
    }
}

/// Totals over every connection the server handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerReport {
    pub connections_accepted: u64,
    pub connections_closed: u64,
    pub records_written: u64,
    pub decode_failures: u64,
    pub sink_failures: u64,
    pub truncated_frames: u64,
    /// Connections ended by shutdown rather than by the device
    pub interrupted: u64,
    /// Handler tasks that panicked or were aborted
    pub handler_failures: u64,
}

impl ServerReport {
    fn absorb(&mut self, summary: &ConnectionSummary) {
        self.connections_closed += 1;
        self.records_written += summary.records_written;
        self.decode_failures += summary.decode_failures;
        self.sink_failures += summary.sink_failures;
        if summary.truncated_bytes.is_some() {
            self.truncated_frames += 1;
        }
        if summary.close_reason == CloseReason::Shutdown {
            self.interrupted += 1;
        }
    }

    fn absorb_join(&mut self, joined: std::result::Result<ConnectionSummary, JoinError>) {
        match joined {
            Ok(summary) => self.absorb(&summary),
            Err(e) => {
                self.handler_failures += 1;
                error!("Connection task failed: {}", e);
            }
        }
    }
}

/// TCP collector bound to its listening socket
pub struct CollectorServer {
    listener: TcpListener,
    sink: Arc<dyn RecordSink>,
    limits: ServerLimits,
}

impl CollectorServer {
    /// Open the record log and bind the listening socket
    pub async fn bind(config: &CollectorConfig) -> Result<Self> {
        let addr = config.listen_addr()?;

        let listener = bind_listener(addr)
            .await
            .context("Failed to bind collector listener")?;

        let mut sink_config = SinkConfig::new(&config.output.path)
            .with_queue_capacity(config.output.queue_capacity);
        if let Some(header) = &config.output.header {
            sink_config = sink_config.with_header(header.clone());
        }

        let sink = CsvLogSink::open(sink_config)
            .await
            .with_context(|| format!("Failed to open record log {}", config.output.path.display()))?;

        Ok(Self::with_sink(listener, Arc::new(sink), ServerLimits::from(config)))
    }

    /// Serve an already-bound listener into any sink
    pub fn with_sink(listener: TcpListener, sink: Arc<dyn RecordSink>, limits: ServerLimits) -> Self {
        Self {
            listener,
            sink,
            limits,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    /// Accept connections until `shutdown` resolves, then drain and close
    pub async fn run_until<F>(self, shutdown: F) -> Result<ServerReport>
    where
        F: Future<Output = ()>,
    {
        let CollectorServer {
            listener,
            sink,
            limits,
        } = self;

        let local = listener.local_addr().ok();
        info!(
            "🚀 Collector accepting device connections on {}",
            local.map(|a| a.to_string()).unwrap_or_else(|| "<unknown>".into())
        );
        match limits.max_connections {
            Some(cap) => info!("Connection cap: {}", cap),
            None => debug!("No connection cap configured"),
        }

        let permits = limits.max_connections.map(|cap| Arc::new(Semaphore::new(cap)));
        let (stop, stop_signal) = watch::channel(false);
        let mut handlers: JoinSet<ConnectionSummary> = JoinSet::new();
        let mut report = ServerReport::default();

        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested, no longer accepting connections");
                    break Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        report.connections_accepted += 1;
                        let task = serve_connection(
                            stream,
                            peer,
                            sink.clone(),
                            limits.clone(),
                            permits.clone(),
                            stop_signal.clone(),
                        );
                        handlers.spawn(task);
                    }
                    Err(source) => {
                        error!("❌ Failed to accept connection: {}", source);
                        break Err(TransportError::Accept { source });
                    }
                },
                Some(joined) = handlers.join_next() => report.absorb_join(joined),
            }
        };

        drop(listener);
        drain_handlers(&mut handlers, &stop, limits.drain_timeout, &mut report).await;

        if let Err(e) = sink.close().await {
            warn!("Record log did not close cleanly: {}", e);
        }
        let metadata = sink.metadata();
        info!(
            "✅ Collector stopped: {} connections, {} records written, {} write failures",
            report.connections_accepted, metadata.records_written, metadata.records_failed
        );

        outcome.context("Collector listener failed")?;
        Ok(report)
    }
}

/// Wait for a permit (if capped) and run one connection to completion
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    sink: Arc<dyn RecordSink>,
    limits: ServerLimits,
    permits: Option<Arc<Semaphore>>,
    mut stop_signal: watch::Receiver<bool>,
) -> ConnectionSummary {
    let _permit = match permits {
        Some(permits) => {
            if permits.available_permits() == 0 {
                info!("⏳ Connection cap reached, {} waits for a free slot", peer);
            }
            tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => return ConnectionSummary::new(peer, CloseReason::Shutdown),
                },
                _ = stop_requested(&mut stop_signal) => {
                    return ConnectionSummary::new(peer, CloseReason::Shutdown);
                }
            }
        }
        None => None,
    };

    configure_stream(&stream);
    let reader = FrameReader::new(stream)
        .with_idle_timeout(limits.idle_timeout)
        .with_read_buffer_size(limits.read_buffer_size);

    ConnectionHandler::new(peer, reader, sink)
        .with_shutdown(stop_signal)
        .run()
        .await
}

async fn drain_handlers(
    handlers: &mut JoinSet<ConnectionSummary>,
    stop: &watch::Sender<bool>,
    drain_timeout: Duration,
    report: &mut ServerReport,
) {
    if handlers.is_empty() {
        return;
    }

    info!(
        "Waiting up to {:?} for {} open connections",
        drain_timeout,
        handlers.len()
    );
    let drained = tokio::time::timeout(drain_timeout, async {
        while let Some(joined) = handlers.join_next().await {
            report.absorb_join(joined);
        }
    })
    .await;
    if drained.is_ok() {
        return;
    }

    warn!("Closing {} connections still open after drain period", handlers.len());
    let _ = stop.send(true);

    let stopped = tokio::time::timeout(FORCED_STOP_GRACE, async {
        while let Some(joined) = handlers.join_next().await {
            report.absorb_join(joined);
        }
    })
    .await;
    if stopped.is_err() {
        handlers.abort_all();
        while let Some(joined) = handlers.join_next().await {
            report.absorb_join(joined);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_codec::encode_frame;
    use meter_types::{MeterFrame, PhaseValues};
    use record_sink::test_utils::CollectorSink;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::oneshot;

    fn frame(device_id: u32) -> [u8; 44] {
        encode_frame(&MeterFrame {
            device_id,
            epoch_seconds: 1_700_000_000,
            currents: PhaseValues::new(1.0, 2.0, 3.0),
            voltages: PhaseValues::new(220.0, 221.0, 222.0),
            active_power: PhaseValues::new(100.0, 200.0, 300.0),
        })
    }

    async fn start(
        limits: ServerLimits,
    ) -> (
        SocketAddr,
        Arc<CollectorSink>,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<ServerReport>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let sink = Arc::new(CollectorSink::new());
        let server = CollectorServer::with_sink(listener, sink.clone(), limits);
        let addr = server.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = stopped.await;
        }));
        (addr, sink, stop, task)
    }

    async fn wait_for_lines(sink: &CollectorSink, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while sink.line_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_accepts_and_records_frames() {
        let (addr, sink, stop, task) = start(ServerLimits::default()).await;

        let mut device = TcpStream::connect(addr).await.unwrap();
        device.write_all(&frame(7)).await.unwrap();
        device.shutdown().await.unwrap();
        drop(device);

        wait_for_lines(&sink, 1).await;
        stop.send(()).unwrap();
        let report = task.await.unwrap().unwrap();

        assert_eq!(report.connections_accepted, 1);
        assert_eq!(report.records_written, 1);
        assert!(sink.lines()[0].starts_with("7,2023-11-14 22:13:20,"));
    }

    #[tokio::test]
    async fn test_connection_cap_queues_excess_connections() {
        let limits = ServerLimits {
            max_connections: Some(1),
            ..ServerLimits::default()
        };
        let (addr, sink, stop, task) = start(limits).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(&frame(1)).await.unwrap();
        wait_for_lines(&sink, 1).await;

        // Second device is accepted but not served while the first holds the slot
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(&frame(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.line_count(), 1);

        drop(first);
        wait_for_lines(&sink, 2).await;
        assert!(sink.lines()[1].starts_with("2,"));

        drop(second);
        stop.send(()).unwrap();
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.connections_accepted, 2);
        assert_eq!(report.records_written, 2);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_connections_after_drain() {
        let limits = ServerLimits {
            drain_timeout: Duration::from_millis(50),
            ..ServerLimits::default()
        };
        let (addr, sink, stop, task) = start(limits).await;

        // Device stays connected through shutdown
        let mut device = TcpStream::connect(addr).await.unwrap();
        device.write_all(&frame(3)).await.unwrap();
        wait_for_lines(&sink, 1).await;

        stop.send(()).unwrap();
        let report = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(report.interrupted, 1);
        assert_eq!(report.connections_closed, 1);
        drop(device);
    }

    #[tokio::test]
    async fn test_listener_closed_after_shutdown() {
        let (addr, _sink, stop, task) = start(ServerLimits::default()).await;
        stop.send(()).unwrap();
        task.await.unwrap().unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
