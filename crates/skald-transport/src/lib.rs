//! Transport contract and in-memory adapters for SKALD delivery traffic.

pub mod adapter;

pub use adapter::{
    route_in_memory_outbound, InMemoryAdapter, TransportAdapter, TransportHealthSnapshot,
};
