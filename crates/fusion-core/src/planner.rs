//! # Planner Module
//!
//! The controller tying the engine pieces to a storage backend.
//!
//! A `Planner` owns the allocation engine, the soul roster, the preset
//! slots and the store. Every successful mutation writes the pieces it
//! touched back to the store. Store failures are logged and never fail the
//! mutation itself; the in-memory state stays authoritative.
//!
//! ## Storage Backends
//!
//! - `InMemory`: volatile, used by `Planner::new()`
//! - `File`: single postcard file
//! - `Persistent`: redb database

use crate::aggregation::{StatTotal, compute_totals, node_contributions};
use crate::allocation::AllocationEngine;
use crate::catalog::Catalog;
use crate::compat::can_equip;
use crate::export::{BackupDocument, export_document, parse_document};
use crate::presets::{Preset, PresetManager};
use crate::primitives::{
    BUDGET_KEY, DEFAULT_BUDGET, DEFAULT_PRESET_SLOTS, PRESETS_KEY, SOULS_KEY, TREE_KEY,
};
use crate::souls::SoulRoster;
use crate::storage::{FileStore, MemoryStore, RedbStore, StateStore, StorageBackend};
use crate::{Budget, FusionError, NodeId, Soul, SoulId, SoulLevel, TreeState};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunables read from `fusion.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Number of preset slots.
    pub preset_slots: usize,
    /// Budget used when the store holds none.
    pub default_budget: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            preset_slots: DEFAULT_PRESET_SLOTS,
            default_budget: DEFAULT_BUDGET,
        }
    }
}

/// Point usage overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget: u32,
    pub used: i64,
    pub remaining: i64,
}

// =============================================================================
// STORE HELPERS
// =============================================================================

/// Read and decode one stored blob. Unreadable values are logged and
/// treated as absent.
fn load_blob<T: DeserializeOwned>(store: &StorageBackend, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable stored value, using default");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "store read failed, using default");
            None
        }
    }
}

/// Encode and write one blob. Failures are logged, not returned.
fn store_blob<T: Serialize + ?Sized>(store: &mut StorageBackend, key: &str, value: &T) {
    let result = serde_json::to_vec(value)
        .map_err(|e| FusionError::SerializationError(e.to_string()))
        .and_then(|bytes| store.set(key, &bytes));
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "failed to persist planner state");
    }
}

// =============================================================================
// PLANNER
// =============================================================================

/// Fusion tree planner: engine, roster, presets and persistence.
#[derive(Debug)]
pub struct Planner {
    engine: AllocationEngine,
    souls: SoulRoster,
    presets: PresetManager,
    backend: StorageBackend,
    config: PlannerConfig,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    /// In-memory planner over the built-in tree with the starter souls.
    #[must_use]
    pub fn new() -> Self {
        Self::open(
            Arc::new(Catalog::fusion_tree()),
            StorageBackend::InMemory(MemoryStore::new()),
            PlannerConfig::default(),
        )
    }

    /// Load a planner from a backend.
    ///
    /// Missing keys fall back to defaults: empty tree, starter souls,
    /// empty presets and `config.default_budget`.
    #[must_use]
    pub fn open(catalog: Arc<Catalog>, backend: StorageBackend, config: PlannerConfig) -> Self {
        let state: TreeState = load_blob(&backend, TREE_KEY).unwrap_or_default();
        let souls = load_blob::<Vec<Soul>>(&backend, SOULS_KEY)
            .map(SoulRoster::from_souls)
            .unwrap_or_else(SoulRoster::starter);
        let presets = load_blob::<Vec<Option<Preset>>>(&backend, PRESETS_KEY)
            .map(|slots| PresetManager::from_slots(slots, config.preset_slots))
            .unwrap_or_else(|| PresetManager::new(config.preset_slots));
        let budget = load_blob::<i64>(&backend, BUDGET_KEY)
            .map(Budget::clamped)
            .unwrap_or(Budget(config.default_budget));

        tracing::debug!(
            backend = backend.name(),
            budget = budget.value(),
            souls = souls.len(),
            "planner opened"
        );

        Self {
            engine: AllocationEngine::with_state(catalog, budget, state),
            souls,
            presets,
            backend,
            config,
        }
    }

    /// Planner backed by a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>, config: PlannerConfig) -> Result<Self, FusionError> {
        let store = RedbStore::open(path)?;
        Ok(Self::open(
            Arc::new(Catalog::fusion_tree()),
            StorageBackend::Persistent(store),
            config,
        ))
    }

    /// Planner backed by a single store file at `path`.
    pub fn with_file(path: impl AsRef<Path>, config: PlannerConfig) -> Result<Self, FusionError> {
        let store = FileStore::open(path)?;
        Ok(Self::open(
            Arc::new(Catalog::fusion_tree()),
            StorageBackend::File(store),
            config,
        ))
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        self.engine.catalog()
    }

    #[must_use]
    pub fn state(&self) -> &TreeState {
        self.engine.state()
    }

    #[must_use]
    pub fn budget(&self) -> Budget {
        self.engine.budget()
    }

    #[must_use]
    pub fn souls(&self) -> &SoulRoster {
        &self.souls
    }

    #[must_use]
    pub fn presets(&self) -> &PresetManager {
        &self.presets
    }

    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }

    #[must_use]
    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            budget: self.engine.budget().value(),
            used: self.engine.used_points(),
            remaining: self.engine.remaining_points(),
        }
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    fn persist_tree(&mut self) {
        store_blob(&mut self.backend, TREE_KEY, self.engine.state());
    }

    fn persist_souls(&mut self) {
        let souls: Vec<&Soul> = self.souls.iter().collect();
        store_blob(&mut self.backend, SOULS_KEY, &souls);
    }

    fn persist_presets(&mut self) {
        store_blob(&mut self.backend, PRESETS_KEY, self.presets.slots());
    }

    fn persist_budget(&mut self) {
        store_blob(
            &mut self.backend,
            BUDGET_KEY,
            &i64::from(self.engine.budget().value()),
        );
    }

    /// Write every piece of state to the store.
    pub fn persist_all(&mut self) {
        self.persist_tree();
        self.persist_souls();
        self.persist_presets();
        self.persist_budget();
    }

    // =========================================================================
    // ALLOCATION
    // =========================================================================

    /// Set a node's level. See [`AllocationEngine::set_level`].
    pub fn set_level(&mut self, node: NodeId, level: i64) -> Result<&TreeState, FusionError> {
        let before = self.engine.state().level_of(node);
        self.engine.set_level(node, level)?;
        if self.engine.state().level_of(node) != before {
            self.persist_tree();
        }
        Ok(self.engine.state())
    }

    /// Equip a soul from the roster on a node.
    ///
    /// Fails with `UnknownSoul` if the soul is not in the roster and with
    /// `IncompatibleSoul` if it fails the rarity or tag gate.
    pub fn equip(&mut self, node: NodeId, soul: SoulId) -> Result<&TreeState, FusionError> {
        let def = self.engine.catalog().node(node)?;
        let found = self
            .souls
            .get(&soul)
            .ok_or_else(|| FusionError::UnknownSoul(soul.clone()))?;
        if !can_equip(def, found) {
            tracing::debug!(%node, %soul, "rejected incompatible soul");
            return Err(FusionError::IncompatibleSoul { soul, node });
        }

        self.engine.equip(node, soul)?;
        self.persist_tree();
        Ok(self.engine.state())
    }

    pub fn unequip(&mut self, node: NodeId) -> &TreeState {
        self.engine.unequip(node);
        self.persist_tree();
        self.engine.state()
    }

    pub fn set_soul_level(&mut self, node: NodeId, level: SoulLevel) -> &TreeState {
        self.engine.set_soul_level(node, level);
        self.persist_tree();
        self.engine.state()
    }

    /// Replace the budget (clamped at 0).
    pub fn set_budget(&mut self, value: i64) -> Budget {
        let budget = self.engine.set_budget(value);
        self.persist_budget();
        budget
    }

    pub fn reset(&mut self) -> &TreeState {
        self.engine.reset();
        self.persist_tree();
        self.engine.state()
    }

    // =========================================================================
    // SOULS
    // =========================================================================

    /// Add or replace a soul. Returns its id.
    pub fn save_soul(&mut self, soul: Soul) -> Result<SoulId, FusionError> {
        let id = self.souls.upsert(soul)?;
        self.persist_souls();
        Ok(id)
    }

    /// Delete a soul and unequip it from every node.
    pub fn delete_soul(&mut self, id: &SoulId) -> Result<Soul, FusionError> {
        let removed = self.souls.remove(id)?;
        let nodes = self.engine.unequip_soul_everywhere(id);
        tracing::debug!(soul = %id, unequipped = nodes.len(), "soul deleted");

        self.persist_souls();
        if !nodes.is_empty() {
            self.persist_tree();
        }
        Ok(removed)
    }

    /// Souls that may be equipped on `node`, sorted by name.
    pub fn candidates_for(&self, node: NodeId) -> Result<Vec<&Soul>, FusionError> {
        let def = self.engine.catalog().node(node)?;
        Ok(self.souls.candidates_for(def, self.engine.state()))
    }

    // =========================================================================
    // STATS
    // =========================================================================

    #[must_use]
    pub fn totals(&self) -> Vec<StatTotal> {
        compute_totals(self.engine.catalog(), self.engine.state(), &self.souls)
    }

    /// Per-node rounded bonuses.
    pub fn node_stats(&self, node: NodeId) -> Result<Vec<StatTotal>, FusionError> {
        self.engine.catalog().node(node)?;
        Ok(node_contributions(
            self.engine.catalog(),
            self.engine.state(),
            &self.souls,
            node,
        ))
    }

    // =========================================================================
    // PRESETS
    // =========================================================================

    /// Snapshot the current tree into a slot.
    pub fn save_preset(
        &mut self,
        slot: usize,
        label: Option<String>,
    ) -> Result<&Preset, FusionError> {
        self.presets.save(slot, self.engine.state(), label)?;
        self.persist_presets();
        self.presets.get(slot).ok_or(FusionError::EmptySlot(slot))
    }

    /// Restore the tree from a slot.
    ///
    /// A snapshot spending more than the current budget is rejected with
    /// `OverBudgetSnapshot` and the tree is left as it was.
    pub fn load_preset(&mut self, slot: usize) -> Result<&TreeState, FusionError> {
        let snapshot = self.presets.load(slot)?;
        self.engine.validate_budget(&snapshot)?;
        self.engine.restore(snapshot);
        self.persist_tree();
        Ok(self.engine.state())
    }

    // =========================================================================
    // BACKUP
    // =========================================================================

    /// Full backup of the planner.
    #[must_use]
    pub fn export_document(&self) -> BackupDocument {
        BackupDocument {
            tree_state: Some(self.engine.state().clone()),
            souls: Some(self.souls.iter().cloned().collect()),
            presets: Some(self.presets.slots().to_vec()),
            user_fusion_level: Some(i64::from(self.engine.budget().value())),
        }
    }

    /// Full backup as pretty JSON bytes.
    pub fn export_bytes(&self) -> Result<Vec<u8>, FusionError> {
        export_document(&self.export_document())
    }

    /// Parse and apply a JSON backup. Nothing changes if parsing fails.
    pub fn import_bytes(&mut self, data: &[u8]) -> Result<(), FusionError> {
        let document = parse_document(data)?;
        self.import_document(document);
        Ok(())
    }

    /// Apply the pieces a backup carries; absent pieces stay as they are.
    ///
    /// The tree state is restored as-is, without budget checks.
    pub fn import_document(&mut self, document: BackupDocument) {
        if let Some(state) = document.tree_state {
            self.engine.restore(state);
            self.persist_tree();
        }
        if let Some(souls) = document.souls {
            self.souls = SoulRoster::from_souls(souls);
            self.persist_souls();
        }
        if let Some(slots) = document.presets {
            self.presets = PresetManager::from_slots(slots, self.config.preset_slots);
            self.persist_presets();
        }
        if let Some(level) = document.user_fusion_level {
            self.engine.set_budget(level);
            self.persist_budget();
        }
        tracing::info!("backup imported");
    }
}

// =============================================================================
// TESTS
// =============================================================================
