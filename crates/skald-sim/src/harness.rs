use std::collections::BTreeMap;

use skald_codec::{decode_envelope, encode_envelope, AckMessage, Envelope};
use skald_core::{ClusterId, Facility, LogEntry};
use skald_transport::{InMemoryAdapter, TransportAdapter};

/// Reference in-memory aggregator for simulations and scenario tests.
///
/// Consumes inbound batches, deduplicates entries by sequence number (the
/// client's contract is at-least-once), and acknowledges the highest
/// contiguous sequence received so far.
pub struct SimAggregator {
    facility: Facility,
    cluster: ClusterId,
    received: BTreeMap<u64, LogEntry>,
    acked_through: u64,
    duplicates: usize,
    foreign_batches: usize,
    decode_failures: usize,
}

impl SimAggregator {
    pub fn new(facility: Facility, cluster: ClusterId) -> Self {
        Self {
            facility,
            cluster,
            received: BTreeMap::new(),
            acked_through: 0,
            duplicates: 0,
            foreign_batches: 0,
            decode_failures: 0,
        }
    }

    /// Drains inbound traffic on `adapter`, recording batches and queueing
    /// one ack reply per accepted batch. Returns the number of batches
    /// accepted.
    pub fn process(&mut self, adapter: &mut InMemoryAdapter) -> usize {
        let mut accepted = 0;
        while let Some((peer, bytes)) = adapter.recv() {
            let envelope = match decode_envelope(&bytes) {
                Ok(envelope) => envelope,
                Err(_) => {
                    self.decode_failures += 1;
                    continue;
                }
            };
            let batch = match envelope {
                Envelope::Batch(batch) => batch,
                Envelope::Ack(_) => continue,
            };
            if batch.cluster != self.cluster {
                self.foreign_batches += 1;
                continue;
            }

            for entry in batch.entries {
                if self.received.insert(entry.seq, entry).is_some() {
                    self.duplicates += 1;
                }
            }
            while self.received.contains_key(&(self.acked_through + 1)) {
                self.acked_through += 1;
            }

            let ack = encode_envelope(&Envelope::Ack(AckMessage {
                facility: self.facility.to_string(),
                through_seq: self.acked_through,
            }))
            .expect("ack envelope should encode");
            let _ = adapter.send(&peer, &ack);
            accepted += 1;
        }
        accepted
    }

    /// Highest contiguous sequence acknowledged so far.
    pub fn acked_through(&self) -> u64 {
        self.acked_through
    }

    /// Number of distinct entries received.
    pub fn received_count(&self) -> usize {
        self.received.len()
    }

    /// Redelivered entries observed (at-least-once duplicates).
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Batches dropped on cluster-identity mismatch.
    pub fn foreign_batches(&self) -> usize {
        self.foreign_batches
    }

    /// Inbound payloads dropped because they failed to decode.
    pub fn decode_failures(&self) -> usize {
        self.decode_failures
    }

    /// Received entries in sequence order.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.received.values()
    }
}
