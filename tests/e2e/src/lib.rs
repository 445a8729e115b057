//! End-to-End Test Framework for the meter collector
//!
//! Starts a real collector on an ephemeral port with its record log in a
//! temporary directory, drives it with raw TCP clients or the device
//! simulator, and validates the resulting log file.

pub mod fixtures;
pub mod framework;
pub mod validation;

pub use fixtures::*;
pub use framework::{init_test_logging, TestCollector};
pub use validation::{validate_log, LogReport};
