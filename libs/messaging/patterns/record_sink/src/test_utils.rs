//! In-memory sinks for exercising record consumers without touching disk

use crate::{RecordSink, SinkError, SinkMetadata};
use async_trait::async_trait;
use meter_types::Record;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Sink that keeps every line in memory and can inject append failures
#[derive(Debug, Default)]
pub struct CollectorSink {
    header_written: AtomicBool,
    lines: Mutex<Vec<String>>,
    fail_remaining: AtomicUsize,
    failed: AtomicU64,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` appends with a write error
    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Record lines (without trailing newlines), header excluded
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn line_count(&self) -> usize {
        self.lines.lock().map(|lines| lines.len()).unwrap_or_default()
    }

    pub fn header_written(&self) -> bool {
        self.header_written.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RecordSink for CollectorSink {
    async fn ensure_header(&self) -> Result<(), SinkError> {
        self.header_written.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        if self.take_failure() {
            self.failed.fetch_add(1, Ordering::SeqCst);
            let error = std::io::Error::new(std::io::ErrorKind::Other, "injected failure");
            return Err(SinkError::write("memory", &error));
        }

        match self.lines.lock() {
            Ok(mut lines) => {
                lines.push(record.to_string());
                Ok(())
            }
            Err(_) => Err(SinkError::Closed),
        }
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::new("collector", "memory")
            .with_counts(self.line_count() as u64, self.failures())
    }
}

/// Sink whose every append fails
#[derive(Debug)]
pub struct FailingSink {
    path: PathBuf,
}

impl FailingSink {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("/unwritable/data_log.csv"),
        }
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSink for FailingSink {
    async fn ensure_header(&self) -> Result<(), SinkError> {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        Err(SinkError::open(&self.path, &error))
    }

    async fn append(&self, _record: &Record) -> Result<(), SinkError> {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        Err(SinkError::write(&self.path, &error))
    }

    fn metadata(&self) -> SinkMetadata {
        SinkMetadata::new("failing", "memory").with_endpoint(self.path.display().to_string())
    }
}
