//! # fusion-core
//!
//! The allocation, validation and stat aggregation engine for fusion tree
//! planning.
//!
//! A fusion tree is a static DAG of nodes. Each node has a rarity (which
//! sets its point cost and bonus curve) and a tag (which, with rarity,
//! decides which souls fit on it). Players spend a point budget raising
//! node levels and equip souls whose stats scale with the node level.
//!
//! ## Layout
//!
//! - `catalog`: the immutable node DAG
//! - `scaling` / `compat`: pure rules
//! - `allocation`: the only mutator of tree state
//! - `aggregation`: stat totals
//! - `souls` / `presets`: user data
//! - `export` / `formats` / `storage`: backup and persistence
//! - `planner`: the controller combining all of the above
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Deterministic: `BTreeMap` everywhere, so output never depends on
//!   insertion order
//! - Every rejected operation leaves state untouched

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregation;
pub mod allocation;
pub mod catalog;
pub mod compat;
pub mod export;
pub mod formats;
pub mod planner;
pub mod presets;
pub mod primitives;
pub mod scaling;
pub mod souls;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Budget, FusionError, NodeId, Rarity, Soul, SoulId, SoulLevel, Stat, Tag, TreeState,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use aggregation::{StatTotal, compute_totals, node_contributions};
pub use allocation::AllocationEngine;
pub use catalog::{Catalog, NodeDef};
pub use compat::can_equip;
pub use export::{BackupDocument, backup_checksum, export_document, parse_document};
pub use planner::{BudgetSummary, Planner, PlannerConfig};
pub use presets::{Preset, PresetManager};
pub use scaling::{cost_per_level, level_bonus, level_multiplier, round_stat};
pub use souls::SoulRoster;

#[cfg(feature = "crypto-hash")]
pub use export::{backup_crypto_hash, compute_blake3_hash};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use formats::{PersistenceHeader, store_from_bytes, store_to_bytes};
pub use storage::{FileStore, MemoryStore, RedbStore, StateStore, StorageBackend};
