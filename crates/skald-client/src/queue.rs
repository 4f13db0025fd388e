use std::collections::VecDeque;

use skald_core::LogEntry;

/// Ordered buffer of entries awaiting acknowledgment.
///
/// Append-only at the tail, prunable only from the head. Entries are kept in
/// strictly increasing `seq` order with no interior gaps; trimming may only
/// remove a prefix.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<LogEntry>,
}

impl PendingQueue {
    /// Appends an entry at the tail.
    ///
    /// Panics if the entry would break the strictly-increasing seq order;
    /// that indicates state corruption in the owning client.
    pub fn push(&mut self, entry: LogEntry) {
        if let Some(tail) = self.entries.back() {
            assert!(
                entry.seq > tail.seq,
                "pending queue append out of order: seq {} after {}",
                entry.seq,
                tail.seq
            );
        }
        self.entries.push_back(entry);
    }

    /// Removes entries with `seq <= through_seq` from the head.
    ///
    /// Stops at the first retained entry or the queue end; returns the
    /// number of entries removed.
    pub fn trim_through(&mut self, through_seq: u64) -> usize {
        let mut removed = 0;
        while let Some(front) = self.entries.front() {
            if front.seq > through_seq {
                break;
            }
            self.entries.pop_front();
            removed += 1;
        }
        removed
    }

    /// Index of the first entry with `seq > cursor`, if any.
    pub fn first_after(&self, cursor: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.seq > cursor)
    }

    /// Clones `count` consecutive entries starting at `start`, bounded by
    /// the queue end.
    pub fn clone_range(&self, start: usize, count: usize) -> Vec<LogEntry> {
        self.entries.iter().skip(start).take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seq of the oldest still-pending entry, if any.
    pub fn front_seq(&self) -> Option<u64> {
        self.entries.front().map(|e| e.seq)
    }

    /// Seq of the newest still-pending entry, if any.
    pub fn back_seq(&self) -> Option<u64> {
        self.entries.back().map(|e| e.seq)
    }
}
