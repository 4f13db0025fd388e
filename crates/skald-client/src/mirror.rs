use thiserror::Error;

use skald_core::LogEntry;

/// Local system-log sink write failure.
///
/// Mirror writes are best-effort; the client logs and swallows this.
#[derive(Debug, Error)]
#[error("mirror write failed: {0}")]
pub struct MirrorError(pub String);

/// Local system-log sink consumed by the delivery client.
///
/// Implementations must be bounded, local side effects: they are invoked
/// inside the client's critical section and must never call back into the
/// client.
pub trait LocalMirror: Send {
    /// Writes one rendered entry to the local log.
    fn write(&mut self, entry: &LogEntry) -> Result<(), MirrorError>;
}

/// Mirror that discards every entry.
#[derive(Debug, Default)]
pub struct NullMirror;

impl LocalMirror for NullMirror {
    fn write(&mut self, _entry: &LogEntry) -> Result<(), MirrorError> {
        Ok(())
    }
}

/// Mirror that records rendered lines in memory, for tests and simulations.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    lines: Vec<String>,
}

impl MemoryMirror {
    /// Lines recorded so far, in write order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Drains and returns all recorded lines.
    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl LocalMirror for MemoryMirror {
    fn write(&mut self, entry: &LogEntry) -> Result<(), MirrorError> {
        self.lines.push(entry.to_string());
        Ok(())
    }
}
