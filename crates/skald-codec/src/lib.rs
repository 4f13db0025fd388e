//! Wire messages and CBOR codec for SKALD batch/ack traffic.

pub mod error;
pub mod message;

pub use error::CodecError;
pub use message::{
    decode_envelope, encode_envelope, AckMessage, BatchMessage, Envelope, ENVELOPE_V1_VERSION,
};
