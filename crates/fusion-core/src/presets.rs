//! # Preset Manager
//!
//! A fixed number of named snapshot slots. Saving copies the state in;
//! loading copies it back out, so later edits never touch a saved preset.

use crate::primitives::DEFAULT_PRESET_SLOTS;
use crate::{FusionError, TreeState};
use serde::{Deserialize, Serialize};

/// A named snapshot of a tree allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(rename = "id", alias = "slotIndex")]
    pub slot: usize,
    #[serde(rename = "name", alias = "label")]
    pub label: String,
    pub state: TreeState,
}

impl Preset {
    /// Label used when none is given.
    #[must_use]
    pub fn default_label(slot: usize) -> String {
        format!("Preset {}", slot + 1)
    }
}

/// Fixed-size array of optional presets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetManager {
    slots: Vec<Option<Preset>>,
}

impl Default for PresetManager {
    fn default() -> Self {
        Self::new(DEFAULT_PRESET_SLOTS)
    }
}

impl PresetManager {
    /// Create a manager with `count` empty slots.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Rebuild from stored slots, padding up to `min_count`.
    ///
    /// Extra stored slots are kept. Each preset's index is taken from its
    /// position in the list.
    #[must_use]
    pub fn from_slots(mut slots: Vec<Option<Preset>>, min_count: usize) -> Self {
        if slots.len() < min_count {
            slots.resize(min_count, None);
        }
        for (index, preset) in slots.iter_mut().enumerate() {
            if let Some(preset) = preset {
                preset.slot = index;
                preset.state.normalize();
            }
        }
        Self { slots }
    }

    fn check_slot(&self, slot: usize) -> Result<(), FusionError> {
        if slot >= self.slots.len() {
            return Err(FusionError::InvalidSlot {
                slot,
                count: self.slots.len(),
            });
        }
        Ok(())
    }

    /// Save a copy of `state` into `slot`, overwriting any previous preset.
    pub fn save(
        &mut self,
        slot: usize,
        state: &TreeState,
        label: Option<String>,
    ) -> Result<&Preset, FusionError> {
        self.check_slot(slot)?;
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| Preset::default_label(slot));

        let preset = self.slots[slot].insert(Preset {
            slot,
            label,
            state: state.clone(),
        });
        tracing::debug!(slot, label = %preset.label, "preset saved");
        Ok(preset)
    }

    /// Copy of the state saved in `slot`.
    pub fn load(&self, slot: usize) -> Result<TreeState, FusionError> {
        self.check_slot(slot)?;
        self.slots[slot]
            .as_ref()
            .map(|preset| preset.state.clone())
            .ok_or(FusionError::EmptySlot(slot))
    }

    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Preset> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<Preset>] {
        &self.slots
    }
}
