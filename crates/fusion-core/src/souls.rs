//! # Soul Roster
//!
//! The user-editable list of souls. Order is insertion order; lookups are
//! by id.

use crate::catalog::NodeDef;
use crate::compat::can_equip;
use crate::primitives::MAX_SOUL_NAME_LENGTH;
use crate::{FusionError, Rarity, Soul, SoulId, SoulLevel, Stat, Tag, TreeState};

/// Ordered collection of souls with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoulRoster {
    souls: Vec<Soul>,
}

impl SoulRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The three souls a fresh planner starts with.
    #[must_use]
    pub fn starter() -> Self {
        let wolf = Soul::new("Wolf Spirit", Rarity::Common, vec![Tag::Attack])
            .with_id("s1")
            .with_stats(SoulLevel::ONE, vec![Stat::flat("Attack Power", 10.0)])
            .with_stats(SoulLevel::TWO, vec![Stat::flat("Attack Power", 15.0)])
            .with_stats(SoulLevel::THREE, vec![Stat::flat("Attack Power", 25.0)]);
        let turtle = Soul::new("Turtle Shell", Rarity::Common, vec![Tag::Defense])
            .with_id("s2")
            .with_stats(SoulLevel::ONE, vec![Stat::flat("Defense", 5.0)])
            .with_stats(SoulLevel::TWO, vec![Stat::flat("Defense", 8.0)])
            .with_stats(SoulLevel::THREE, vec![Stat::flat("Defense", 12.0)]);
        let light = Soul::new("Divine Light", Rarity::Legendary, vec![Tag::Wildcard])
            .with_id("s3")
            .with_stats(SoulLevel::ONE, vec![Stat::percent("Experience", 5.0)])
            .with_stats(SoulLevel::TWO, vec![Stat::percent("Experience", 7.0)])
            .with_stats(SoulLevel::THREE, vec![Stat::percent("Experience", 10.0)]);

        let mut souls = vec![wolf, turtle, light];
        for (soul, image) in souls.iter_mut().zip(["237", "10", "17"]) {
            soul.image_ref = format!("https://picsum.photos/id/{}/100/100", image);
        }
        Self { souls }
    }

    /// Build a roster from stored souls. Later duplicates of an id win.
    #[must_use]
    pub fn from_souls(souls: Vec<Soul>) -> Self {
        let mut roster = Self::new();
        for soul in souls {
            match roster.position(&soul.id) {
                Some(index) => roster.souls[index] = soul,
                None => roster.souls.push(soul),
            }
        }
        roster
    }

    fn position(&self, id: &SoulId) -> Option<usize> {
        self.souls.iter().position(|soul| &soul.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &SoulId) -> Option<&Soul> {
        self.souls.iter().find(|soul| &soul.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &SoulId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Soul> {
        self.souls.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.souls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.souls.is_empty()
    }

    /// Insert a new soul or replace the one with the same id.
    ///
    /// A blank id gets a generated one. Returns the stored id.
    pub fn upsert(&mut self, mut soul: Soul) -> Result<SoulId, FusionError> {
        let name = soul.name.trim();
        if name.is_empty() {
            return Err(FusionError::InvalidSoul("name must not be blank".to_string()));
        }
        if name.chars().count() > MAX_SOUL_NAME_LENGTH {
            return Err(FusionError::InvalidSoul(format!(
                "name exceeds {} characters",
                MAX_SOUL_NAME_LENGTH
            )));
        }
        if soul.tags.is_empty() {
            return Err(FusionError::InvalidSoul("at least one tag is required".to_string()));
        }

        soul.name = name.to_string();
        soul.tags.sort();
        soul.tags.dedup();
        if soul.id.is_blank() {
            soul.id = SoulId::generate();
        }

        let id = soul.id.clone();
        match self.position(&id) {
            Some(index) => self.souls[index] = soul,
            None => self.souls.push(soul),
        }
        Ok(id)
    }

    /// Remove a soul by id.
    pub fn remove(&mut self, id: &SoulId) -> Result<Soul, FusionError> {
        let index = self
            .position(id)
            .ok_or_else(|| FusionError::UnknownSoul(id.clone()))?;
        Ok(self.souls.remove(index))
    }

    /// Souls that may go on `node`: compatible and not equipped on another
    /// node. Sorted by name.
    #[must_use]
    pub fn candidates_for(&self, node: &NodeDef, state: &TreeState) -> Vec<&Soul> {
        let mut candidates: Vec<&Soul> = self
            .souls
            .iter()
            .filter(|soul| can_equip(node, soul))
            .filter(|soul| {
                state
                    .node_holding(&soul.id)
                    .is_none_or(|holder| holder == node.id)
            })
            .collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates
    }

    /// Consume the roster into its souls, in order.
    #[must_use]
    pub fn into_souls(self) -> Vec<Soul> {
        self.souls
    }
}
