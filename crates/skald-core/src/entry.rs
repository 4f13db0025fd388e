use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Facility, Origin, Severity, Timestamp};

/// One logged event, immutable once constructed.
///
/// Entries are assigned a strictly increasing `seq` at append time and are
/// freely cloneable into outbound batches without synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Identity of the originating instance.
    pub who: Origin,
    /// Capture-time clock reading.
    pub stamp: Timestamp,
    /// Per-client sequence number, strictly increasing, never reused.
    pub seq: u64,
    /// Severity level.
    pub severity: Severity,
    /// Rendered single-line message, no embedded newlines.
    pub message: String,
    /// Facility tag active at append time.
    pub facility: Facility,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} : [{}] {}",
            self.stamp.millis(),
            self.who,
            self.seq,
            self.severity,
            self.message
        )
    }
}
