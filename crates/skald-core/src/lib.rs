//! Core SKALD primitives shared across crates.
//!
//! Includes severity/facility/origin types, timestamps, cluster identity,
//! the log entry record, and base errors.

pub mod entry;
pub mod error;
pub mod types;

pub use entry::LogEntry;
pub use error::SkaldError;
pub use types::{ClusterId, Facility, Origin, Severity, Timestamp};
