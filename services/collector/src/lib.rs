//! # Meter Collector
//!
//! ## Purpose
//!
//! Accepts persistent TCP connections from metering devices, reassembles the
//! byte stream of each into fixed 44-byte frames, decodes every frame into a
//! display-ready record and appends it to the shared record log.
//!
//! ## Architecture Role
//!
//! ```text
//! Device ─TCP─┐
//! Device ─TCP─┼─→ [CollectorServer] ─spawn─→ ConnectionHandler ─┐
//! Device ─TCP─┘     accept loop              FrameReader        ├─→ CsvLogSink ─→ data_log.csv
//!                                             decode_frame       │   (single writer)
//!                                  ConnectionHandler ... ────────┘
//! ```
//!
//! ## Failure Isolation
//! - **Frame level**: decode and sink failures are logged, the record is
//!   dropped, the connection keeps reading
//! - **Connection level**: read errors and idle timeouts close only that
//!   connection
//! - **Listener level**: bind/accept failures stop the server

pub mod connection;
pub mod server;

pub use connection::{CloseReason, ConnectionHandler, ConnectionState, ConnectionSummary};
pub use server::{CollectorServer, ServerLimits, ServerReport};
