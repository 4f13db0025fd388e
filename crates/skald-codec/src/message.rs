use serde::{Deserialize, Serialize};
use skald_core::{ClusterId, LogEntry};

use crate::error::CodecError;

/// Wire version for `Envelope` frames.
pub const ENVELOPE_V1_VERSION: u16 = 1;

/// Ordered batch of log entries with a cluster provenance tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMessage {
    /// Cluster/session identity the aggregator validates provenance against.
    pub cluster: ClusterId,
    /// Entries in strictly increasing `seq` order.
    pub entries: Vec<LogEntry>,
}

impl BatchMessage {
    /// Validates batch schema and entry ordering.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.entries.is_empty() {
            return Err(CodecError::InvalidBatch("batch must not be empty"));
        }
        let mut prev = 0_u64;
        for entry in &self.entries {
            if entry.seq == 0 {
                return Err(CodecError::InvalidBatch("entry seq must not be zero"));
            }
            if entry.seq <= prev {
                return Err(CodecError::InvalidBatch(
                    "entry seqs must be strictly increasing",
                ));
            }
            if entry.message.contains('\n') {
                return Err(CodecError::InvalidBatch(
                    "entry message must not contain newlines",
                ));
            }
            prev = entry.seq;
        }
        Ok(())
    }

    /// Sequence number of the first entry.
    pub fn first_seq(&self) -> Option<u64> {
        self.entries.first().map(|e| e.seq)
    }

    /// Sequence number of the last entry.
    pub fn last_seq(&self) -> Option<u64> {
        self.entries.last().map(|e| e.seq)
    }
}

/// Acknowledgment that all entries with `seq <= through_seq` were received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMessage {
    /// Facility the ack applies to; empty means the configured default.
    pub facility: String,
    /// Highest sequence number durably received.
    pub through_seq: u64,
}

/// One wire message: either an outbound batch or an inbound ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    Batch(BatchMessage),
    Ack(AckMessage),
}

impl Envelope {
    /// Validates the enclosed message.
    pub fn validate(&self) -> Result<(), CodecError> {
        match self {
            Envelope::Batch(batch) => batch.validate(),
            Envelope::Ack(_) => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrameV1 {
    version: u16,
    envelope: Envelope,
}

#[derive(Serialize)]
struct FrameRefV1<'a> {
    version: u16,
    envelope: &'a Envelope,
}

/// Encodes an envelope as a versioned CBOR frame after validation.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    envelope.validate()?;
    let frame = FrameRefV1 {
        version: ENVELOPE_V1_VERSION,
        envelope,
    };
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&frame, &mut bytes).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decodes and validates a versioned CBOR frame.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, CodecError> {
    let frame: FrameV1 =
        ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    if frame.version != ENVELOPE_V1_VERSION {
        return Err(CodecError::InvalidEnvelope("unsupported envelope version"));
    }
    frame.envelope.validate()?;
    Ok(frame.envelope)
}
