//! Append-only CSV record log
//!
//! All appends funnel through one writer task that owns the file handle.
//! Each record becomes a single `write_all` of one complete line, so lines
//! from concurrent connections can never interleave. Callers wait for the
//! writer's acknowledgement, which means a returned `Ok(())` has reached the
//! operating system.

use crate::{RecordSink, SinkConfig, SinkError, SinkMetadata};
use async_trait::async_trait;
use meter_types::Record;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

enum WriterCommand {
    Append {
        line: String,
        ack: oneshot::Sender<Result<(), SinkError>>,
    },
    Close {
        ack: oneshot::Sender<Result<(), SinkError>>,
    },
}

#[derive(Debug, Default)]
struct SinkCounters {
    written: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl SinkCounters {
    fn record_failure(&self, error: &SinkError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(error.to_string());
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|last| last.clone())
    }
}

/// Process-wide CSV record log shared by every connection handler
#[derive(Debug)]
pub struct CsvLogSink {
    path: PathBuf,
    header: String,
    commands: mpsc::Sender<WriterCommand>,
    counters: Arc<SinkCounters>,
}

impl CsvLogSink {
    /// Ensure the header exists, open the file for appending and start the
    /// writer task. Must be called from within a tokio runtime.
    pub async fn open(config: SinkConfig) -> Result<Self, SinkError> {
        let SinkConfig {
            path,
            header,
            queue_capacity,
        } = config;

        if write_header_if_missing(&path, &header).await? {
            info!("📝 Created record log {} with header", path.display());
        } else {
            debug!("Record log {} already exists, appending", path.display());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(|e| SinkError::open(&path, &e))?;

        let counters = Arc::new(SinkCounters::default());
        let (commands, receiver) = mpsc::channel(queue_capacity.max(1));
        tokio::spawn(run_writer(file, path.clone(), receiver, counters.clone()));

        Ok(Self {
            path,
            header,
            commands,
            counters,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.counters.written.load(Ordering::Relaxed)
    }

    pub fn records_failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    async fn submit(&self, line: String) -> Result<(), SinkError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(WriterCommand::Append { line, ack })
            .await
            .map_err(|_| SinkError::Closed)?;
        done.await.map_err(|_| SinkError::Closed)?
    }
}

#[async_trait]
impl RecordSink for CsvLogSink {
    async fn ensure_header(&self) -> Result<(), SinkError> {
        write_header_if_missing(&self.path, &self.header).await?;
        Ok(())
    }

    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        self.submit(record.to_csv_line()).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        let (ack, done) = oneshot::channel();
        if self.commands.send(WriterCommand::Close { ack }).await.is_err() {
            // Writer already gone
            return Ok(());
        }
        done.await.unwrap_or(Ok(()))
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::new("record-log", "csv")
            .with_endpoint(self.path.display().to_string())
            .with_counts(self.records_written(), self.records_failed())
            .with_last_error(self.counters.last_error())
    }
}

/// Create `path` with `header` as its first line unless it already exists.
///
/// Uses exclusive creation so two racing callers cannot both write a header.
/// Returns `true` when this call created the file.
async fn write_header_if_missing(path: &Path, header: &str) -> Result<bool, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SinkError::open(path, &e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(SinkError::open(path, &e)),
    };

    let mut line = String::with_capacity(header.len() + 1);
    line.push_str(header);
    line.push('\n');

    file.write_all(line.as_bytes())
        .await
        .map_err(|e| SinkError::write(path, &e))?;
    file.flush().await.map_err(|e| SinkError::write(path, &e))?;

    Ok(true)
}

/// Append side of the writer task
///
/// A failed `write_all` may leave part of a line in the file. The next line
/// then starts with a newline so it never merges into the torn fragment.
#[derive(Debug)]
struct LineWriter<W> {
    out: W,
    torn: bool,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    fn new(out: W) -> Self {
        Self { out, torn: false }
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let result = if self.torn {
            let mut repaired = String::with_capacity(line.len() + 1);
            repaired.push('\n');
            repaired.push_str(line);
            self.write_text(&repaired).await
        } else {
            self.write_text(line).await
        };

        self.torn = result.is_err();
        result
    }

    async fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.flush().await
    }
}

async fn append_line(
    writer: &mut LineWriter<File>,
    path: &Path,
    counters: &SinkCounters,
    line: &str,
) -> Result<(), SinkError> {
    let result = writer
        .write_line(line)
        .await
        .map_err(|e| SinkError::write(path, &e));

    match &result {
        Ok(()) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            error!("❌ {}", e);
            counters.record_failure(e);
        }
    }
    result
}

async fn run_writer(
    file: File,
    path: PathBuf,
    mut receiver: mpsc::Receiver<WriterCommand>,
    counters: Arc<SinkCounters>,
) {
    debug!("Record writer started for {}", path.display());
    let mut writer = LineWriter::new(file);

    while let Some(command) = receiver.recv().await {
        match command {
            WriterCommand::Append { line, ack } => {
                let result = append_line(&mut writer, &path, &counters, &line).await;
                let _ = ack.send(result);
            }
            WriterCommand::Close { ack } => {
                receiver.close();
                // Appends already queued ahead of close still land
                while let Ok(WriterCommand::Append { line, ack: pending }) = receiver.try_recv() {
                    let result = append_line(&mut writer, &path, &counters, &line).await;
                    let _ = pending.send(result);
                }

                let result = match writer.out.sync_data().await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!("Failed to sync {}: {}", path.display(), e);
                        Err(SinkError::write(&path, &e))
                    }
                };
                let _ = ack.send(result);
                break;
            }
        }
    }

    info!(
        "📝 Record writer for {} stopped ({} written, {} failed)",
        path.display(),
        counters.written.load(Ordering::Relaxed),
        counters.failed.load(Ordering::Relaxed)
    );
}
