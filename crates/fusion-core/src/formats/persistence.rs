//! # Persistence Format
//!
//! Binary layout of the file store: the whole key/value map in one file.
//!
//! Format: Header (5 bytes) + postcard-serialized map.
//! - 4 bytes: Magic ("FUSN")
//! - 1 byte: Version
//!
//! File I/O lives in [`crate::storage`]; this module only converts bytes.
//! Size and header are validated before the payload is deserialized.

use crate::{FusionError, primitives};
use std::collections::BTreeMap;

/// Minimum valid file size (header only).
const MIN_FILE_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes the store payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate magic and version.
    pub fn validate(&self) -> Result<(), FusionError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(FusionError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(FusionError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 5] {
        let mut bytes = [0u8; 5];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FusionError> {
        let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(FusionError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let Some(&version) = rest.first() else {
            return Err(FusionError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        Ok(Self {
            magic: *magic,
            version,
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a key/value map to bytes (header + payload).
pub fn store_to_bytes(entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>, FusionError> {
    let header = PersistenceHeader::new();
    let payload =
        postcard::to_stdvec(entries).map_err(|e| FusionError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(MIN_FILE_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a key/value map from bytes.
///
/// Validates, in order: minimum size, maximum size, header. Only then is
/// the payload parsed.
pub fn store_from_bytes(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, FusionError> {
    if bytes.len() < MIN_FILE_SIZE {
        return Err(FusionError::SerializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > primitives::MAX_STORE_PAYLOAD_SIZE {
        return Err(FusionError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_STORE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[MIN_FILE_SIZE..]).map_err(|e| {
        FusionError::SerializationError(format!("Failed to deserialize store data: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
