use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use skald_codec::{decode_envelope, encode_envelope, BatchMessage, CodecError, Envelope};
use skald_core::Severity;
use skald_transport::TransportAdapter;

use crate::client::DeliveryClient;

/// Counters accumulated across runtime ticks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Inbound byte payloads polled from the transport.
    pub inbound_messages: usize,
    /// Acks accepted by the client.
    pub acks_accepted: usize,
    /// Acks rejected on facility mismatch.
    pub acks_rejected: usize,
    /// Inbound payloads that failed envelope decoding.
    pub decode_failures: usize,
    /// Batches handed to the transport (including loopback sends).
    pub batches_sent: usize,
    /// Entries across all sent batches.
    pub entries_sent: usize,
    /// Transport send attempts that returned an error.
    pub send_failures: usize,
    /// Inbound batch messages surfaced to the embedder.
    pub batches_received: usize,
    /// Session resets applied.
    pub session_resets: usize,
}

/// Observable outcomes of one runtime tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// An aggregator ack was accepted and the queue trimmed.
    AckAccepted { through_seq: u64 },
    /// An ack was ignored on facility mismatch.
    AckRejected { through_seq: u64 },
    /// An inbound batch arrived (self-addressed delivery); the embedder
    /// consumes it.
    BatchReceived(BatchMessage),
    /// A batch was handed to the transport.
    BatchSent {
        first_seq: u64,
        last_seq: u64,
        entries: usize,
    },
}

/// Errors surfaced by the delivery runtime.
///
/// Transport send errors are contained per the fire-and-forget contract;
/// only codec failures propagate.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Periodic driver around a shared [`DeliveryClient`] and one transport.
///
/// Owns the adapter, the aggregator peer handle, and the client's own peer
/// handle used as the loopback destination in self-addressed mode.
pub struct DeliveryRuntime<A: TransportAdapter> {
    pub client: Arc<DeliveryClient>,
    pub adapter: A,
    pub aggregator: A::Peer,
    pub identity: A::Peer,
    pub stats: RuntimeStats,
}

impl<A: TransportAdapter> DeliveryRuntime<A>
where
    A::Error: fmt::Debug,
{
    pub fn new(
        client: Arc<DeliveryClient>,
        adapter: A,
        aggregator: A::Peer,
        identity: A::Peer,
    ) -> Self {
        Self {
            client,
            adapter,
            aggregator,
            identity,
            stats: RuntimeStats::default(),
        }
    }

    /// Appends one entry, performing any self-addressed loopback send
    /// outside the client's critical section.
    pub fn log(&mut self, severity: Severity, message: &str) -> Result<(), DeliveryError> {
        if let Some(batch) = self.client.log(severity, message) {
            self.send_batch(batch, true)?;
        }
        Ok(())
    }

    /// Appends each non-empty line of `text` as its own entry.
    pub fn log_lines(&mut self, severity: Severity, text: &str) -> Result<(), DeliveryError> {
        for batch in self.client.log_lines(severity, text) {
            self.send_batch(batch, true)?;
        }
        Ok(())
    }

    /// Runs one driver cycle: routes inbound acks and batches, then drains
    /// and sends at most one outbound batch.
    ///
    /// A failed send is counted and recovered later through
    /// [`session_reset`]; it never propagates.
    ///
    /// [`session_reset`]: DeliveryRuntime::session_reset
    pub fn tick(&mut self) -> Result<Vec<TickEvent>, DeliveryError> {
        let mut events = Vec::new();

        while let Some((_peer, bytes)) = self.adapter.recv() {
            self.stats.inbound_messages += 1;
            match decode_envelope(&bytes) {
                Ok(Envelope::Ack(ack)) => {
                    if self.client.handle_ack(&ack) {
                        self.stats.acks_accepted += 1;
                        events.push(TickEvent::AckAccepted {
                            through_seq: ack.through_seq,
                        });
                    } else {
                        self.stats.acks_rejected += 1;
                        events.push(TickEvent::AckRejected {
                            through_seq: ack.through_seq,
                        });
                    }
                }
                Ok(Envelope::Batch(batch)) => {
                    self.stats.batches_received += 1;
                    events.push(TickEvent::BatchReceived(batch));
                }
                Err(err) => {
                    warn!("inbound envelope decode failed: {err}");
                    self.stats.decode_failures += 1;
                }
            }
        }

        // Drain only while the transport can take the batch; draining marks
        // entries sent, and a batch dropped here is recovered only by a
        // session reset.
        if self.adapter.can_send() && self.client.has_pending() {
            if let Some(batch) = self.client.drain_batch() {
                if let Some(event) = self.send_batch(batch, false)? {
                    events.push(event);
                }
            }
        }

        Ok(events)
    }

    /// Applies a transport session reset: rewinds the client's send cursor
    /// so the next tick resends the unacknowledged window.
    pub fn session_reset(&mut self) {
        self.client.reset_session();
        self.stats.session_resets += 1;
        debug!("delivery session reset");
    }

    fn send_batch(
        &mut self,
        batch: BatchMessage,
        loopback: bool,
    ) -> Result<Option<TickEvent>, DeliveryError> {
        let first_seq = batch.first_seq().unwrap_or(0);
        let last_seq = batch.last_seq().unwrap_or(0);
        let entries = batch.entries.len();

        let bytes = encode_envelope(&Envelope::Batch(batch))?;
        let destination = if loopback {
            self.identity.clone()
        } else {
            self.aggregator.clone()
        };
        match self.adapter.send(&destination, &bytes) {
            Ok(()) => {
                self.stats.batches_sent += 1;
                self.stats.entries_sent += entries;
                Ok(Some(TickEvent::BatchSent {
                    first_seq,
                    last_seq,
                    entries,
                }))
            }
            Err(err) => {
                warn!("batch send failed: {err:?}");
                self.stats.send_failures += 1;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DeliveryRuntime, TickEvent};
    use crate::client::DeliveryClient;
    use crate::config::ClientConfig;
    use skald_codec::{decode_envelope, encode_envelope, AckMessage, Envelope};
    use skald_core::{Origin, Severity};
    use skald_transport::{InMemoryAdapter, TransportAdapter};

    fn runtime(config: ClientConfig) -> DeliveryRuntime<InMemoryAdapter> {
        let client = Arc::new(DeliveryClient::new(Origin::from("osd.0"), config));
        DeliveryRuntime::new(
            client,
            InMemoryAdapter::default(),
            "mon.a".to_string(),
            "osd.0".to_string(),
        )
    }

    fn ack_bytes(facility: &str, through_seq: u64) -> Vec<u8> {
        encode_envelope(&Envelope::Ack(AckMessage {
            facility: facility.to_string(),
            through_seq,
        }))
        .expect("ack should encode")
    }

    #[test]
    fn tick_drains_one_batch_to_the_aggregator() {
        let mut rt = runtime(ClientConfig::default());
        rt.log(Severity::Info, "one").expect("log should succeed");
        rt.log(Severity::Info, "two").expect("log should succeed");

        let events = rt.tick().expect("tick should succeed");
        assert_eq!(
            events,
            vec![TickEvent::BatchSent {
                first_seq: 1,
                last_seq: 2,
                entries: 2
            }]
        );

        let outbound = rt.adapter.take_outbound();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].0, "mon.a");
        let envelope = decode_envelope(&outbound[0].1).expect("outbound should decode");
        match envelope {
            Envelope::Batch(batch) => assert_eq!(batch.entries.len(), 2),
            other => panic!("expected batch envelope, got {other:?}"),
        }
        assert_eq!(rt.stats.batches_sent, 1);
        assert_eq!(rt.stats.entries_sent, 2);
    }

    #[test]
    fn inbound_ack_trims_the_client_queue() {
        let mut rt = runtime(ClientConfig::default());
        rt.log(Severity::Info, "one").expect("log should succeed");
        rt.tick().expect("send tick");

        rt.adapter.enqueue_inbound("mon.a", ack_bytes("daemon", 1));
        let events = rt.tick().expect("ack tick");
        assert_eq!(events, vec![TickEvent::AckAccepted { through_seq: 1 }]);
        assert_eq!(rt.client.pending_len(), 0);
        assert_eq!(rt.stats.acks_accepted, 1);
    }

    #[test]
    fn mismatched_facility_ack_is_surfaced_as_rejected() {
        let mut rt = runtime(ClientConfig::default());
        rt.log(Severity::Info, "one").expect("log should succeed");
        rt.tick().expect("send tick");

        rt.adapter.enqueue_inbound("mon.a", ack_bytes("authlog", 1));
        let events = rt.tick().expect("ack tick");
        assert_eq!(events, vec![TickEvent::AckRejected { through_seq: 1 }]);
        assert_eq!(rt.client.pending_len(), 1);
        assert_eq!(rt.stats.acks_rejected, 1);
    }

    #[test]
    fn malformed_inbound_payload_is_counted_and_ignored() {
        let mut rt = runtime(ClientConfig::default());
        rt.adapter.enqueue_inbound("mon.a", vec![0xDE, 0xAD]);
        let events = rt.tick().expect("tick should succeed");
        assert!(events.is_empty());
        assert_eq!(rt.stats.decode_failures, 1);
    }

    #[test]
    fn send_unavailable_transport_defers_draining() {
        let mut rt = runtime(ClientConfig::default());
        rt.log(Severity::Info, "one").expect("log should succeed");
        rt.adapter.set_allow_send(false);

        let events = rt.tick().expect("tick should succeed");
        assert!(events.is_empty());
        assert!(rt.client.has_pending());

        rt.adapter.set_allow_send(true);
        let events = rt.tick().expect("tick should succeed");
        assert_eq!(events.len(), 1);
        assert!(!rt.client.has_pending());
    }

    #[test]
    fn self_addressed_log_loops_back_to_the_identity_peer() {
        let mut rt = runtime(ClientConfig {
            self_addressed: true,
            ..ClientConfig::default()
        });
        rt.log(Severity::Info, "mon event")
            .expect("log should succeed");

        let outbound = rt.adapter.take_outbound();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].0, "osd.0");
        let envelope = decode_envelope(&outbound[0].1).expect("loopback should decode");
        match envelope {
            Envelope::Batch(batch) => {
                assert_eq!(batch.entries.len(), 1);
                assert_eq!(batch.entries[0].message, "mon event");
            }
            other => panic!("expected batch envelope, got {other:?}"),
        }
    }

    #[test]
    fn inbound_batch_is_surfaced_to_the_embedder() {
        let mut rt = runtime(ClientConfig {
            self_addressed: true,
            ..ClientConfig::default()
        });
        rt.log(Severity::Info, "mon event")
            .expect("log should succeed");

        // Route the loopback send back into our own inbox.
        let outbound = rt.adapter.take_outbound();
        for (_, bytes) in outbound {
            rt.adapter.enqueue_inbound("osd.0", bytes);
        }

        let events = rt.tick().expect("tick should succeed");
        let received = events.iter().find_map(|e| match e {
            TickEvent::BatchReceived(batch) => Some(batch),
            _ => None,
        });
        let batch = received.expect("loopback batch should be surfaced");
        assert_eq!(batch.entries[0].message, "mon event");
        assert_eq!(rt.stats.batches_received, 1);
    }

    #[test]
    fn session_reset_resends_the_unacked_window() {
        let mut rt = runtime(ClientConfig::default());
        rt.log_lines(Severity::Info, "one\ntwo\nthree")
            .expect("log should succeed");
        rt.tick().expect("send tick");
        rt.adapter.take_outbound();

        rt.adapter.enqueue_inbound("mon.a", ack_bytes("daemon", 1));
        rt.tick().expect("ack tick");

        rt.session_reset();
        let events = rt.tick().expect("resend tick");
        assert_eq!(
            events,
            vec![TickEvent::BatchSent {
                first_seq: 2,
                last_seq: 3,
                entries: 2
            }]
        );
        assert_eq!(rt.stats.session_resets, 1);
    }

    #[test]
    fn send_errors_are_contained_and_counted() {
        struct FailingAdapter;

        impl TransportAdapter for FailingAdapter {
            type Peer = String;
            type Error = &'static str;

            fn send(&mut self, _peer: &Self::Peer, _bytes: &[u8]) -> Result<(), Self::Error> {
                Err("wire down")
            }

            fn recv(&mut self) -> Option<(Self::Peer, Vec<u8>)> {
                None
            }
        }

        let client = Arc::new(DeliveryClient::new(
            Origin::from("osd.0"),
            ClientConfig::default(),
        ));
        let mut rt = DeliveryRuntime::new(
            client,
            FailingAdapter,
            "mon.a".to_string(),
            "osd.0".to_string(),
        );
        rt.log(Severity::Info, "one").expect("log should succeed");

        let events = rt.tick().expect("tick should not propagate send errors");
        assert!(events.is_empty());
        assert_eq!(rt.stats.send_failures, 1);
        // Entries stay marked sent; recovery is via session reset.
        assert!(!rt.client.has_pending());
        rt.session_reset();
        assert!(rt.client.has_pending());
    }
}
