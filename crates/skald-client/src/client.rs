use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use skald_codec::{AckMessage, BatchMessage};
use skald_core::{LogEntry, Origin, Severity, Timestamp};

use crate::config::ClientConfig;
use crate::mirror::{LocalMirror, NullMirror};
use crate::queue::PendingQueue;

struct ClientState {
    queue: PendingQueue,
    /// Highest seq assigned so far; the next append gets `last_seq + 1`.
    last_seq: u64,
    /// Highest seq handed to the transport during the current session.
    last_sent: u64,
    config: ClientConfig,
    mirror: Box<dyn LocalMirror>,
}

/// Reliable at-least-once delivery client for cluster log entries.
///
/// Owns the pending queue and all send/ack counters behind a single lock;
/// every public operation is atomic with respect to the others. Producer
/// threads share the client behind an `Arc` and call [`log`] concurrently
/// with the driver's [`drain_batch`] / [`handle_ack`] / [`reset_session`].
///
/// [`log`]: DeliveryClient::log
/// [`drain_batch`]: DeliveryClient::drain_batch
/// [`handle_ack`]: DeliveryClient::handle_ack
/// [`reset_session`]: DeliveryClient::reset_session
pub struct DeliveryClient {
    who: Origin,
    state: Mutex<ClientState>,
}

impl DeliveryClient {
    /// Creates a client that discards local mirror writes.
    pub fn new(who: Origin, config: ClientConfig) -> Self {
        Self::with_mirror(who, config, Box::new(NullMirror))
    }

    /// Creates a client with an explicit local mirror sink.
    pub fn with_mirror(who: Origin, config: ClientConfig, mirror: Box<dyn LocalMirror>) -> Self {
        Self {
            who,
            state: Mutex::new(ClientState {
                queue: PendingQueue::default(),
                last_seq: 0,
                last_sent: 0,
                config,
                mirror,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        // Poisoning means another operation panicked mid-update; the state
        // can no longer be trusted.
        self.state
            .lock()
            .expect("delivery client state lock poisoned")
    }

    /// Appends one single-line entry.
    ///
    /// Assigns the next sequence number, mirrors locally when enabled and
    /// the severity clears the threshold, and queues the entry for monitor
    /// delivery. In self-addressed mode this returns a single-entry loopback
    /// batch which the caller must hand to the transport after this call
    /// returns; the client never touches the transport from inside its
    /// critical section.
    pub fn log(&self, severity: Severity, message: &str) -> Option<BatchMessage> {
        let mut st = self.lock();
        let seq = st.last_seq + 1;
        st.last_seq = seq;

        let entry = LogEntry {
            who: self.who.clone(),
            stamp: Timestamp::now(),
            seq,
            severity,
            message: message.to_string(),
            facility: st.config.facility.clone(),
        };
        debug!(seq, %severity, "log entry appended");

        if st.config.mirror_to_local && severity >= st.config.local_threshold {
            if let Err(err) = st.mirror.write(&entry) {
                warn!("local mirror write failed: {err}");
            }
        }

        if !st.config.monitor_delivery {
            return None;
        }
        st.queue.push(entry.clone());

        if st.config.self_addressed {
            debug!(seq, "queueing loopback batch for self-addressed delivery");
            return Some(BatchMessage {
                cluster: st.config.cluster,
                entries: vec![entry],
            });
        }
        None
    }

    /// Appends each non-empty line of `text` as its own entry.
    ///
    /// Returns the loopback batches produced in self-addressed mode, in
    /// append order.
    pub fn log_lines(&self, severity: Severity, text: &str) -> Vec<BatchMessage> {
        text.lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| self.log(severity, line))
            .collect()
    }

    /// Builds the next outbound batch of unsent pending entries.
    ///
    /// Entries are copied, not moved: the queue retains them until they are
    /// acknowledged. Returns `None` when everything pending has already been
    /// sent this session.
    ///
    /// The unsent window is derived from the queue itself, not from
    /// `last_seq`: sequence numbers assigned while monitor delivery was
    /// disabled were never queued and must not be counted as unsent.
    pub fn drain_batch(&self) -> Option<BatchMessage> {
        let mut st = self.lock();
        // Entries with seq <= last_sent are retained only because they are
        // unacked; anything after the cursor is the unsent window.
        let start = st.queue.first_after(st.last_sent)?;

        let num_unsent = st.queue.len() - start;
        let cap = st.config.max_entries_per_message;
        let num_send = if cap > 0 { num_unsent.min(cap) } else { num_unsent };

        let entries = st.queue.clone_range(start, num_send);
        let last_copied = entries
            .last()
            .expect("drained batch must contain at least one entry")
            .seq;
        st.last_sent = last_copied;

        debug!(
            queued = st.queue.len(),
            last_seq = st.last_seq,
            sent_through = st.last_sent,
            batch = entries.len(),
            "drained log batch"
        );
        Some(BatchMessage {
            cluster: st.config.cluster,
            entries,
        })
    }

    /// Processes an aggregator acknowledgment.
    ///
    /// An empty ack facility is read as the configured default. An ack whose
    /// facility differs from the client's current facility is ignored and
    /// `false` is returned; otherwise entries with `seq <= through_seq` are
    /// trimmed from the queue head. Idempotent.
    pub fn handle_ack(&self, ack: &AckMessage) -> bool {
        let mut st = self.lock();

        let ack_facility = if ack.facility.is_empty() {
            st.config.default_ack_facility.as_str()
        } else {
            ack.facility.as_str()
        };
        if ack_facility != st.config.facility.as_str() {
            debug!(
                ack_facility,
                facility = st.config.facility.as_str(),
                "ack facility mismatch, ignoring"
            );
            return false;
        }

        let removed = st.queue.trim_through(ack.through_seq);
        debug!(
            through_seq = ack.through_seq,
            removed,
            queued = st.queue.len(),
            "ack accepted"
        );
        true
    }

    /// Rewinds the send cursor after the transport session is recreated.
    ///
    /// The new session has no memory of what was transmitted, so the cursor
    /// moves to just before the oldest still-pending entry and the next
    /// [`drain_batch`] resends exactly the unacknowledged window. Entries
    /// already acknowledged and trimmed are never resent.
    ///
    /// [`drain_batch`]: DeliveryClient::drain_batch
    pub fn reset_session(&self) {
        let mut st = self.lock();
        st.last_sent = match st.queue.front_seq() {
            Some(front) => front - 1,
            None => st.last_seq,
        };
        debug!(
            sent_through = st.last_sent,
            queued = st.queue.len(),
            "session reset, send cursor rewound"
        );
    }

    /// Whether any queued entry has not yet been sent this session.
    pub fn has_pending(&self) -> bool {
        let st = self.lock();
        st.queue.back_seq().map_or(false, |seq| seq > st.last_sent)
    }

    /// Number of entries awaiting acknowledgment.
    ///
    /// Grows without bound if acknowledgments stop arriving; embedders can
    /// alarm on this.
    pub fn pending_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Replaces the configuration snapshot.
    ///
    /// Affects subsequent appends and acks only; queued entries keep the
    /// facility they were stamped with.
    pub fn reconfigure(&self, config: ClientConfig) {
        self.lock().config = config;
    }
}
