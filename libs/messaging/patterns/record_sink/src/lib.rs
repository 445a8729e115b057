//! # Record Sink
//!
//! ## Purpose
//!
//! Durable, append-only destination for decoded meter records. Every
//! connection handler in the collector appends through one shared sink; the
//! sink guarantees that each appended line lands whole, never interleaved
//! with a line from another caller.
//!
//! ## Architecture Role
//!
//! ```text
//! Handler A ─┐
//! Handler B ─┼─ append(&Record) ─→ [bounded queue] ─→ single writer task ─→ data_log.csv
//! Handler C ─┘        ↑                                     ↓
//!               awaits ack                        one write_all per line
//! ```
//!
//! ## Sinks
//! - [`CsvLogSink`]: the process-wide CSV record log
//! - [`test_utils::CollectorSink`]: in-memory sink with failure injection

pub mod config;
pub mod error;
pub mod metadata;
pub mod sinks;
pub mod test_utils;

use async_trait::async_trait;
use meter_types::Record;
use std::fmt::Debug;
use std::sync::Arc;

pub use config::SinkConfig;
pub use error::SinkError;
pub use metadata::SinkMetadata;
pub use sinks::CsvLogSink;

/// A destination for decoded records
#[async_trait]
pub trait RecordSink: Send + Sync + Debug {
    /// Create the destination and write the header row if it does not exist
    /// yet. Idempotent; never overwrites existing content.
    async fn ensure_header(&self) -> Result<(), SinkError>;

    /// Append one record as one line, atomically with respect to other callers
    async fn append(&self, record: &Record) -> Result<(), SinkError>;

    /// Flush pending appends and stop accepting new ones
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Get sink metadata for debugging/monitoring
    fn metadata(&self) -> SinkMetadata;
}

#[async_trait]
impl<S: RecordSink + ?Sized> RecordSink for Arc<S> {
    async fn ensure_header(&self) -> Result<(), SinkError> {
        (**self).ensure_header().await
    }

    async fn append(&self, record: &Record) -> Result<(), SinkError> {
        (**self).append(record).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        (**self).close().await
    }

    fn metadata(&self) -> SinkMetadata {
        (**self).metadata()
    }
}
