//! Concrete sink implementations

pub mod csv_log;

pub use csv_log::CsvLogSink;
