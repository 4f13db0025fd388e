use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use skald_client::{ClientConfig, DeliveryClient, DeliveryRuntime, RuntimeStats};
use skald_core::{Origin, Severity};
use skald_transport::{route_in_memory_outbound, InMemoryAdapter};

use crate::harness::SimAggregator;

/// Deterministic loss model for a delivery/ack exercise.
#[derive(Debug, Clone, Copy)]
pub struct LossScenario {
    /// Independent drop probability for each outbound batch and ack leg.
    pub loss_rate_percent: u8,
    /// RNG seed; equal seeds replay identical runs.
    pub seed: u64,
    /// Tick budget before the run is abandoned.
    pub max_ticks: u32,
    /// Ticks without ack progress before the driver resets the session.
    pub reset_after_quiet_ticks: u32,
}

pub const PRACTICAL_BASELINE: LossScenario = LossScenario {
    loss_rate_percent: 10,
    seed: 42,
    max_ticks: 500,
    reset_after_quiet_ticks: 5,
};

/// Outcome of one scenario run.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioReport {
    /// Ticks consumed until full delivery, or the full budget on failure.
    pub ticks_used: u32,
    /// Highest contiguous seq the aggregator acknowledged.
    pub delivered: u64,
    /// Redelivered entries the aggregator deduplicated.
    pub duplicates: usize,
    /// Client runtime counters at the end of the run.
    pub stats: RuntimeStats,
}

/// Runs a client against the reference aggregator under the given loss
/// model until every entry is delivered and acknowledged, or the tick
/// budget runs out.
///
/// The driver mimics production behavior: it resets the session whenever
/// ack progress stalls, which is what recovers batches lost in transit.
pub fn run_lossy_delivery(
    scenario: &LossScenario,
    config: ClientConfig,
    num_entries: u64,
) -> ScenarioReport {
    let cluster = config.cluster;
    let facility = config.facility.clone();

    let client = Arc::new(DeliveryClient::new(Origin::from("osd.0"), config));
    let mut rt = DeliveryRuntime::new(
        client,
        InMemoryAdapter::default(),
        "mon.a".to_string(),
        "osd.0".to_string(),
    );
    let mut agg_adapter = InMemoryAdapter::default();
    let mut agg = SimAggregator::new(facility, cluster);
    let mut rng = StdRng::seed_from_u64(scenario.seed);

    for i in 1..=num_entries {
        rt.log(Severity::Info, &format!("event {i}"))
            .expect("log should succeed");
    }

    let mut quiet_ticks = 0;
    let mut last_acked = 0;
    let mut ticks_used = scenario.max_ticks;

    for tick in 1..=scenario.max_ticks {
        let drop_batch = rng.gen_range(0..100_u8) < scenario.loss_rate_percent;
        rt.adapter.set_drop_outbound(drop_batch);
        rt.tick().expect("tick should succeed");
        rt.adapter.set_drop_outbound(false);

        route_in_memory_outbound(&mut rt.adapter, &mut agg_adapter, "osd.0");
        agg.process(&mut agg_adapter);

        let drop_ack = rng.gen_range(0..100_u8) < scenario.loss_rate_percent;
        if drop_ack {
            agg_adapter.take_outbound();
        } else {
            route_in_memory_outbound(&mut agg_adapter, &mut rt.adapter, "mon.a");
        }

        if agg.acked_through() >= num_entries && rt.client.pending_len() == 0 {
            ticks_used = tick;
            break;
        }

        if agg.acked_through() > last_acked {
            last_acked = agg.acked_through();
            quiet_ticks = 0;
        } else {
            quiet_ticks += 1;
            if quiet_ticks >= scenario.reset_after_quiet_ticks {
                rt.session_reset();
                quiet_ticks = 0;
            }
        }
    }

    ScenarioReport {
        ticks_used,
        delivered: agg.acked_through(),
        duplicates: agg.duplicates(),
        stats: rt.stats,
    }
}
