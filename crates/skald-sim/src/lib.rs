//! Simulation harness for end-to-end delivery/ack exercises.
//!
//! Provides a reference in-memory aggregator and deterministic loss
//! scenarios over the in-memory transport adapters.

pub mod harness;
pub mod scenarios;

pub use harness::SimAggregator;
pub use scenarios::{run_lossy_delivery, LossScenario, ScenarioReport, PRACTICAL_BASELINE};
