//! JSON encoding: compact, no root wrapping, key order preserved.

use crate::{CodecError, Format, Payload};

pub fn encode(payload: &Payload) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(payload).map_err(|e| CodecError::encoding(Format::Json, e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Payload, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::decoding(Format::Json, e))
}
