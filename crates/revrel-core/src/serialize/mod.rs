//! CBOR encoding shared by rows and snapshots.
//!
//! Both use the same encoding, so a snapshot's data can be compared
//! byte-for-byte with the current state of its entity.

mod cbor;

use crate::error::InternalError;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

/// Decode bound for rows; snapshots use `RevrelConfig::max_snapshot_bytes`.
pub const MAX_ROW_BYTES: usize = 4 * 1024 * 1024;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("encode failed: {0}")]
    Serialize(String),

    #[error("decode failed: {0}")]
    Deserialize(String),

    #[error("payload of {len} bytes exceeds decode limit {max_bytes}")]
    DeserializeSizeLimitExceeded { len: usize, max_bytes: usize },
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::serialize_internal(err.to_string())
    }
}

pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    cbor::serialize(value)
}

/// Decode `bytes`, refusing payloads larger than `max_bytes`.
pub fn deserialize_bounded<T: DeserializeOwned>(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<T, SerializeError> {
    cbor::deserialize_bounded(bytes, max_bytes)
}
