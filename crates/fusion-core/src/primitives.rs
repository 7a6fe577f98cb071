//! # Engine Primitives
//!
//! Hardcoded constants for the fusion engine.
//!
//! Scaling factors live next to the formulas in [`crate::scaling`]; this
//! module holds sizing defaults, store keys and format limits.

/// Default number of preset slots.
pub const DEFAULT_PRESET_SLOTS: usize = 5;

/// Default point budget ("fusion level") for a fresh planner.
pub const DEFAULT_BUDGET: u32 = 100;

/// Highest soul level.
pub const MAX_SOUL_LEVEL: u8 = 3;

// =============================================================================
// STORE KEYS
// =============================================================================

/// Store key for the tree allocation blob.
pub const TREE_KEY: &str = "fts_tree";

/// Store key for the soul catalog blob.
pub const SOULS_KEY: &str = "fts_souls";

/// Store key for the preset list blob.
pub const PRESETS_KEY: &str = "fts_presets";

/// Store key for the budget blob.
pub const BUDGET_KEY: &str = "fts_user_level";

// =============================================================================
// BINARY FORMAT
// =============================================================================

/// Magic bytes for the file store header.
///
/// - File Header = Magic Bytes ("FUSN") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"FUSN";

/// Current file store format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of an import document (16 MB).
///
/// Checked before parsing so an oversized upload is rejected without
/// allocating its structure.
pub const MAX_IMPORT_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum size of a file store payload (64 MB).
pub const MAX_STORE_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Maximum length of a soul name.
pub const MAX_SOUL_NAME_LENGTH: usize = 128;
