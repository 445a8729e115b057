//! Sink construction parameters

use meter_types::CSV_HEADER;
use std::path::PathBuf;

/// Default bound on appends queued in front of the writer
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Settings for [`CsvLogSink`](crate::CsvLogSink)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Append-only log file
    pub path: PathBuf,
    /// Header row, written without the trailing newline
    pub header: String,
    /// Pending appends buffered in front of the writer task
    pub queue_capacity: usize,
}

impl SinkConfig {
    /// Standard header and queue size for `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header: CSV_HEADER.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}
