//! Reliable at-least-once log delivery client.
//!
//! This crate wires together the pending entry queue, the lock-domain
//! delivery client, the local mirror sink, and the driver runtime on top of
//! pluggable transports.

pub mod client;
pub mod config;
pub mod mirror;
pub mod queue;
pub mod runtime;

pub use client::DeliveryClient;
pub use config::ClientConfig;
pub use runtime::{DeliveryError, DeliveryRuntime, RuntimeStats, TickEvent};
