/// Information about a sink for monitoring/debugging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkMetadata {
    /// Human-readable sink name
    pub name: String,

    /// Sink type (csv, collector, ...)
    pub sink_type: String,

    /// Destination if applicable (file path)
    pub endpoint: Option<String>,

    /// Records appended successfully
    pub records_written: u64,

    /// Records lost to append failures
    pub records_failed: u64,

    /// Last error if any
    pub last_error: Option<String>,
}

impl SinkMetadata {
    /// Create new metadata with name and type
    pub fn new(name: impl Into<String>, sink_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: sink_type.into(),
            ..Self::default()
        }
    }

    /// Set endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set counters
    pub fn with_counts(mut self, written: u64, failed: u64) -> Self {
        self.records_written = written;
        self.records_failed = failed;
        self
    }

    /// Set last error
    pub fn with_last_error(mut self, error: Option<String>) -> Self {
        self.last_error = error;
        self
    }
}
