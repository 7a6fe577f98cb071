//! # Backup Export Module
//!
//! JSON backup of the whole planner: tree allocation, soul roster, preset
//! slots and budget.
//!
//! Every field is optional on input. Import applies only the pieces a
//! document carries, so a partial backup (for example just `souls`) leaves
//! the rest of the planner as it was.
//!
//! The document is parsed in full before anything is applied; a document
//! that fails to parse has no effect.

use crate::presets::Preset;
use crate::primitives::MAX_IMPORT_DOCUMENT_SIZE;
use crate::{FusionError, Soul, TreeState};
use serde::{Deserialize, Serialize};

// =============================================================================
// BACKUP DOCUMENT
// =============================================================================

/// The backup file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_state: Option<TreeState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub souls: Option<Vec<Soul>>,

    /// Slot list; empty slots are `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<Option<Preset>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_fusion_level: Option<i64>,
}

impl BackupDocument {
    /// Check if the document carries nothing to import.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree_state.is_none()
            && self.souls.is_none()
            && self.presets.is_none()
            && self.user_fusion_level.is_none()
    }

    /// Deterministic checksum over the compact JSON form.
    ///
    /// FNV-1a, 64 bit. Suitable for detecting accidental corruption or
    /// comparing two backups; not for tamper detection.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let bytes = serde_json::to_vec(self).unwrap_or_default();
        bytes.iter().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
        })
    }
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Serialize a backup as pretty-printed JSON.
///
/// # Errors
///
/// Returns `FusionError::SerializationError` if serialization fails.
pub fn export_document(document: &BackupDocument) -> Result<Vec<u8>, FusionError> {
    serde_json::to_vec_pretty(document).map_err(|e| FusionError::SerializationError(e.to_string()))
}

/// Parse a backup document.
///
/// The size limit is checked before parsing.
///
/// # Errors
///
/// Returns `FusionError::MalformedImport` for oversized input, invalid
/// JSON or a wrong shape.
pub fn parse_document(data: &[u8]) -> Result<BackupDocument, FusionError> {
    if data.len() > MAX_IMPORT_DOCUMENT_SIZE {
        return Err(FusionError::MalformedImport(format!(
            "document size {} bytes exceeds maximum allowed {} bytes",
            data.len(),
            MAX_IMPORT_DOCUMENT_SIZE
        )));
    }

    let mut document: BackupDocument =
        serde_json::from_slice(data).map_err(|e| FusionError::MalformedImport(e.to_string()))?;

    if let Some(state) = document.tree_state.as_mut() {
        state.normalize();
    }
    Ok(document)
}

/// Checksum of a backup document.
#[must_use]
pub fn backup_checksum(document: &BackupDocument) -> u64 {
    document.checksum()
}

// =============================================================================
// CRYPTOGRAPHIC HASH SUPPORT
// =============================================================================

/// BLAKE3 hex digest of the pretty JSON export.
///
/// Only available with the `crypto-hash` feature.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn backup_crypto_hash(document: &BackupDocument) -> String {
    let data = export_document(document).unwrap_or_default();
    compute_blake3_hash(&data)
}

/// BLAKE3 hex digest (64 characters) of raw bytes.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
