/*!
 * Binary Snapshot Serialization with bincode
 * Compact encoding for captured heap snapshots
 */

use serde::{de::DeserializeOwned, Serialize};

/// Magic prefix of a snapshot file
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"FLIS";

/// Result type for bincode operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors
#[derive(Debug, thiserror::Error)]
pub enum BincodeError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

// ============================================================================
// Serialization Functions
// ============================================================================

/// Serialize to binary bytes using bincode
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BincodeError::Serialization(e.to_string()))
}

/// Deserialize from binary bytes using bincode
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|e| BincodeError::Deserialization(e.to_string()))
}

/// Serialize with magic and size prefix
///
/// Format: [4-byte magic][8-byte little-endian length][bincode data]
pub fn to_vec_framed<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    let data = to_vec(value)?;
    let len = data.len() as u64;

    let mut result = Vec::with_capacity(12 + data.len());
    result.extend_from_slice(&SNAPSHOT_MAGIC);
    result.extend_from_slice(&len.to_le_bytes());
    result.extend_from_slice(&data);

    Ok(result)
}

/// Deserialize from the framed format written by `to_vec_framed`
pub fn from_slice_framed<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    if bytes.len() < 12 {
        return Err(BincodeError::Deserialization(
            "Buffer too small for snapshot header".to_string(),
        ));
    }

    if bytes[..4] != SNAPSHOT_MAGIC {
        return Err(BincodeError::Deserialization(
            "Missing snapshot magic".to_string(),
        ));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[4..12]);
    let len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[12..];
    if payload.len() < len {
        return Err(BincodeError::Deserialization(format!(
            "Buffer too small: expected {} payload bytes, got {}",
            len,
            payload.len()
        )));
    }

    from_slice(&payload[..len])
}
