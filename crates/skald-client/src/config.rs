use skald_core::{ClusterId, Facility, Severity};

/// Delivery client configuration snapshot.
///
/// Held inside the client's lock; replaceable at runtime through
/// `DeliveryClient::reconfigure`. Changes affect subsequent appends and
/// acks only.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Mirror entries to the local system-log sink.
    pub mirror_to_local: bool,
    /// Facility stamped on new entries and matched against acks.
    pub facility: Facility,
    /// Facility substituted when an ack arrives with an empty facility.
    pub default_ack_facility: Facility,
    /// Minimum severity mirrored locally.
    pub local_threshold: Severity,
    /// Queue entries for delivery to the aggregator.
    pub monitor_delivery: bool,
    /// Per-batch entry cap; 0 means unbounded.
    pub max_entries_per_message: usize,
    /// This instance is itself the aggregator; deliver appends to itself
    /// through an immediate single-entry loopback batch.
    pub self_addressed: bool,
    /// Cluster identity stamped on outbound batches.
    pub cluster: ClusterId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mirror_to_local: false,
            facility: Facility::default(),
            default_ack_facility: Facility::default(),
            local_threshold: Severity::Info,
            monitor_delivery: true,
            max_entries_per_message: 1_000,
            self_addressed: false,
            cluster: [0_u8; 16],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ClientConfig;
    use skald_core::Severity;

    #[test]
    fn default_config_targets_the_monitor_with_a_bounded_cap() {
        let cfg = ClientConfig::default();
        assert!(cfg.monitor_delivery);
        assert!(!cfg.mirror_to_local);
        assert!(!cfg.self_addressed);
        assert_eq!(cfg.max_entries_per_message, 1_000);
        assert_eq!(cfg.local_threshold, Severity::Info);
        assert_eq!(cfg.facility, cfg.default_ack_facility);
    }
}
