//! # Core Type Definitions
//!
//! This module contains all core types for the fusion tree engine:
//! - Node identifiers and classification (`NodeId`, `Rarity`, `Tag`)
//! - Soul representation (`SoulId`, `Soul`, `Stat`, `SoulLevel`)
//! - Allocation state (`TreeState`, `Budget`)
//! - Error types (`FusionError`)
//!
//! ## Determinism Guarantees
//!
//! - Every keyed collection is a `BTreeMap`/`BTreeSet`, so iteration order
//!   (and therefore serialized output) never depends on insertion order.
//! - Stat names stay opaque strings; the soul catalog is user data, not a
//!   closed set.
//!
//! ## Wire Names
//!
//! JSON field names match existing backup files (`nodeLevels`,
//! `equippedSouls`, `statsLvl1`, ...). The longer descriptive names are
//! accepted as aliases on input.

use crate::primitives::MAX_SOUL_LEVEL;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIERS & CLASSIFICATION
// =============================================================================

/// Unique identifier for a node in the fusion tree catalog.
///
/// Stable across the whole catalog and across saved files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rarity tier of a node or a soul.
///
/// Gates both point cost and soul compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

impl Rarity {
    /// All rarities, lowest tier first.
    pub const ALL: [Rarity; 3] = [Rarity::Common, Rarity::Rare, Rarity::Legendary];

    /// Human-readable name, identical to the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Rarity {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FusionError::InvalidSoul(format!("unknown rarity '{}'", s)))
    }
}

/// Category tag of a node or a soul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    Attack,
    Defense,
    Utility,
    PvP,
    /// On a node: accepts any soul. On a soul: fits any node tag.
    Wildcard,
}

impl Tag {
    /// All tags in declaration order.
    pub const ALL: [Tag; 5] = [Tag::Attack, Tag::Defense, Tag::Utility, Tag::PvP, Tag::Wildcard];

    /// Human-readable name, identical to the serialized form.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Tag::Attack => "Attack",
            Tag::Defense => "Defense",
            Tag::Utility => "Utility",
            Tag::PvP => "PvP",
            Tag::Wildcard => "Wildcard",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Tag {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FusionError::InvalidSoul(format!("unknown tag '{}'", s)))
    }
}

// =============================================================================
// SOULS
// =============================================================================

/// Stable unique token identifying a soul.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SoulId(pub String);

impl SoulId {
    /// Create a soul id from any string-like value.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Generate a fresh random id (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SoulId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoulId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Level of an equipped soul. Always 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SoulLevel(u8);

impl SoulLevel {
    pub const ONE: SoulLevel = SoulLevel(1);
    pub const TWO: SoulLevel = SoulLevel(2);
    pub const THREE: SoulLevel = SoulLevel(3);

    /// Raw level value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for SoulLevel {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u8> for SoulLevel {
    type Error = FusionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=MAX_SOUL_LEVEL => Ok(Self(value)),
            other => Err(FusionError::InvalidLevel {
                node: None,
                level: i64::from(other),
            }),
        }
    }
}

impl From<SoulLevel> for u8 {
    fn from(level: SoulLevel) -> Self {
        level.0
    }
}

impl fmt::Display for SoulLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single stat contribution, e.g. `Attack Power +10` or `Experience +5%`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    /// Backups written by older editors store an emptied field as `null`.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub value: f64,
    #[serde(rename = "isPercent", alias = "is_percent", default)]
    pub is_percent: bool,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl Stat {
    /// Create a flat (non-percent) stat.
    #[must_use]
    pub fn flat(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            is_percent: false,
        }
    }

    /// Create a percent stat.
    #[must_use]
    pub fn percent(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            is_percent: true,
        }
    }
}

/// A user-defined stat-bonus item that can be equipped on a compatible node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Soul {
    /// Blank ids are replaced with a generated one when saved to a roster.
    #[serde(default)]
    pub id: SoulId,
    pub name: String,
    pub rarity: Rarity,
    pub tags: Vec<Tag>,
    /// Opaque image handle; never interpreted by the engine.
    #[serde(rename = "imageUrl", alias = "imageRef", default)]
    pub image_ref: String,
    #[serde(rename = "statsLvl1", alias = "statsLevel1", default)]
    pub stats_level1: Vec<Stat>,
    #[serde(rename = "statsLvl2", alias = "statsLevel2", default)]
    pub stats_level2: Vec<Stat>,
    #[serde(rename = "statsLvl3", alias = "statsLevel3", default)]
    pub stats_level3: Vec<Stat>,
}

impl Soul {
    /// Create a soul with a generated id and empty stat blocks.
    #[must_use]
    pub fn new(name: impl Into<String>, rarity: Rarity, tags: Vec<Tag>) -> Self {
        Self {
            id: SoulId::generate(),
            name: name.into(),
            rarity,
            tags,
            image_ref: String::new(),
            stats_level1: Vec::new(),
            stats_level2: Vec::new(),
            stats_level3: Vec::new(),
        }
    }

    /// Replace the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = SoulId::new(id);
        self
    }

    /// Replace the stat block for one soul level.
    #[must_use]
    pub fn with_stats(mut self, level: SoulLevel, stats: Vec<Stat>) -> Self {
        match level.value() {
            1 => self.stats_level1 = stats,
            2 => self.stats_level2 = stats,
            _ => self.stats_level3 = stats,
        }
        self
    }

    /// The stat block active at the given soul level.
    #[must_use]
    pub fn stats_for(&self, level: SoulLevel) -> &[Stat] {
        match level.value() {
            1 => &self.stats_level1,
            2 => &self.stats_level2,
            _ => &self.stats_level3,
        }
    }
}

// =============================================================================
// TREE STATE
// =============================================================================

/// The mutable allocation: node levels plus equipped souls and their levels.
///
/// Invariant: `soul_level_of` has a key iff `equipped_soul_of` has it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeState {
    /// Level invested per node. A missing key means level 0.
    #[serde(rename = "nodeLevels", alias = "node_levels", default)]
    pub node_levels: BTreeMap<NodeId, u32>,

    /// Soul equipped per node (at most one).
    #[serde(rename = "equippedSouls", alias = "equippedSoulOf", default)]
    pub equipped_soul_of: BTreeMap<NodeId, SoulId>,

    /// Soul level per node; meaningful only where a soul is equipped.
    #[serde(rename = "soulLevels", alias = "soulLevelOf", default)]
    pub soul_level_of: BTreeMap<NodeId, SoulLevel>,
}

impl TreeState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Level of a node (0 when absent).
    #[must_use]
    pub fn level_of(&self, node: NodeId) -> u32 {
        self.node_levels.get(&node).copied().unwrap_or(0)
    }

    /// Soul equipped on a node.
    #[must_use]
    pub fn soul_on(&self, node: NodeId) -> Option<&SoulId> {
        self.equipped_soul_of.get(&node)
    }

    /// Level of the soul equipped on a node.
    #[must_use]
    pub fn soul_level(&self, node: NodeId) -> Option<SoulLevel> {
        self.soul_level_of.get(&node).copied()
    }

    /// The node currently holding a soul, if any.
    #[must_use]
    pub fn node_holding(&self, soul: &SoulId) -> Option<NodeId> {
        self.equipped_soul_of
            .iter()
            .find(|(_, equipped)| *equipped == soul)
            .map(|(node, _)| *node)
    }

    /// Check if nothing has been invested or equipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_levels.values().all(|&level| level == 0) && self.equipped_soul_of.is_empty()
    }

    /// Check the equip/soul-level key invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.equipped_soul_of.len() == self.soul_level_of.len()
            && self
                .equipped_soul_of
                .keys()
                .all(|node| self.soul_level_of.contains_key(node))
    }

    /// Restore the canonical form on untrusted input.
    ///
    /// Zero levels are dropped (absent means 0). Orphan soul levels are
    /// dropped; equipped souls without a level get 1.
    pub fn normalize(&mut self) {
        self.node_levels.retain(|_, level| *level > 0);
        let equipped = &self.equipped_soul_of;
        self.soul_level_of.retain(|node, _| equipped.contains_key(node));
        for node in self.equipped_soul_of.keys() {
            self.soul_level_of.entry(*node).or_default();
        }
    }
}

// =============================================================================
// BUDGET
// =============================================================================

/// Total allocatable points ("fusion level"). Never negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Budget(pub u32);

impl Budget {
    /// Build a budget from any integer, clamping to `0..=u32::MAX`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
    }

    /// Get the raw budget value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the fusion engine.
///
/// - Every rejection is local to one requested operation
/// - A rejected operation leaves all state unchanged
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    /// The requested level is negative or out of range.
    #[error("Invalid level {level}{}", .node.map(|n| format!(" for node {n}")).unwrap_or_default())]
    InvalidLevel { node: Option<NodeId>, level: i64 },

    /// The level change would push spending past the budget.
    #[error("Not enough fusion points: need {needed}, {remaining} remaining")]
    InsufficientPoints { needed: i64, remaining: i64 },

    /// The node has no active parent and cannot be unlocked.
    #[error("Node {0} is locked: no parent node is active")]
    NodeLocked(NodeId),

    /// Dropping the node to 0 would orphan an active child.
    #[error("Cannot set node {node} to 0: active child node {child} depends on it")]
    ChildrenDependOnNode { node: NodeId, child: NodeId },

    /// Preset load from a slot with nothing saved.
    #[error("Preset slot {0} is empty")]
    EmptySlot(usize),

    /// Preset slot index outside the configured range.
    #[error("Preset slot {slot} out of range (0..{count})")]
    InvalidSlot { slot: usize, count: usize },

    /// Import document is not valid JSON or has the wrong shape.
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    /// The soul is already equipped on another node.
    #[error("Soul {soul} is already equipped on node {node}")]
    SoulAlreadyEquipped { soul: SoulId, node: NodeId },

    /// A snapshot spends more points than the current budget allows.
    #[error("Snapshot uses {used} points but the budget is {budget}")]
    OverBudgetSnapshot { used: i64, budget: u32 },

    /// The node id is not part of the catalog.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// The soul id is not part of the roster.
    #[error("Unknown soul: {0}")]
    UnknownSoul(SoulId),

    /// The soul fails the rarity or tag gate for the node.
    #[error("Soul {soul} cannot be equipped on node {node}")]
    IncompatibleSoul { soul: SoulId, node: NodeId },

    /// A soul definition failed validation.
    #[error("Invalid soul: {0}")]
    InvalidSoul(String),

    /// A catalog definition failed validation.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soul_level_rejects_out_of_range() {
        assert!(SoulLevel::try_from(0).is_err());
        assert!(SoulLevel::try_from(MAX_SOUL_LEVEL + 1).is_err());
        assert_eq!(SoulLevel::try_from(2).ok(), Some(SoulLevel::TWO));
    }

    #[test]
    fn budget_clamps_negative_to_zero() {
        assert_eq!(Budget::clamped(-5), Budget(0));
        assert_eq!(Budget::clamped(120), Budget(120));
        assert_eq!(Budget::clamped(i64::MAX), Budget(u32::MAX));
    }

    #[test]
    fn tree_state_uses_reference_wire_names() {
        let mut state = TreeState::new();
        state.node_levels.insert(NodeId(1), 2);
        state.equipped_soul_of.insert(NodeId(1), SoulId::from("s1"));
        state.soul_level_of.insert(NodeId(1), SoulLevel::THREE);

        let json = serde_json::to_string(&state).expect("serialize");
        assert_eq!(
            json,
            r#"{"nodeLevels":{"1":2},"equippedSouls":{"1":"s1"},"soulLevels":{"1":3}}"#
        );
    }

    #[test]
    fn tree_state_accepts_descriptive_aliases() {
        let json = r#"{"nodeLevels":{"4":1},"equippedSoulOf":{"4":"x"},"soulLevelOf":{"4":2}}"#;
        let state: TreeState = serde_json::from_str(json).expect("parse");

        assert_eq!(state.level_of(NodeId(4)), 1);
        assert_eq!(state.soul_on(NodeId(4)), Some(&SoulId::from("x")));
        assert_eq!(state.soul_level(NodeId(4)), Some(SoulLevel::TWO));
    }

    #[test]
    fn tree_state_rejects_soul_level_out_of_range() {
        let json = r#"{"soulLevels":{"4":7}}"#;
        assert!(serde_json::from_str::<TreeState>(json).is_err());
    }

    #[test]
    fn normalize_restores_key_invariant() {
        let mut state = TreeState::new();
        state.equipped_soul_of.insert(NodeId(1), SoulId::from("a"));
        state.soul_level_of.insert(NodeId(2), SoulLevel::TWO);
        assert!(!state.is_consistent());

        state.normalize();

        assert!(state.is_consistent());
        assert_eq!(state.soul_level(NodeId(1)), Some(SoulLevel::ONE));
        assert_eq!(state.soul_level(NodeId(2)), None);
    }

    #[test]
    fn normalize_drops_zero_levels() {
        let json = r#"{"nodeLevels":{"1":0,"2":3},"equippedSouls":{"1":"s1"}}"#;
        let mut state: TreeState = serde_json::from_str(json).expect("parse");

        state.normalize();

        assert_eq!(state.node_levels.len(), 1);
        assert_eq!(state.level_of(NodeId(1)), 0);
        assert_eq!(state.level_of(NodeId(2)), 3);
        assert_eq!(state.soul_on(NodeId(1)), Some(&SoulId::from("s1")));
    }

    #[test]
    fn stat_null_value_reads_as_zero() {
        let stat: Stat =
            serde_json::from_str(r#"{"name":"Crit","value":null,"isPercent":true}"#).expect("parse");
        assert_eq!(stat.value, 0.0);
        assert!(stat.is_percent);

        let missing: Stat = serde_json::from_str(r#"{"name":"Crit"}"#).expect("parse");
        assert_eq!(missing.value, 0.0);

        assert!(serde_json::from_str::<Stat>(r#"{"name":"Crit","value":"x"}"#).is_err());
    }

    #[test]
    fn rarity_and_tag_parse_case_insensitively() {
        assert_eq!("legendary".parse::<Rarity>().ok(), Some(Rarity::Legendary));
        assert_eq!("pvp".parse::<Tag>().ok(), Some(Tag::PvP));
        assert!("mythic".parse::<Rarity>().is_err());
    }

    #[test]
    fn soul_stats_for_selects_block() {
        let soul = Soul::new("Wolf", Rarity::Common, vec![Tag::Attack])
            .with_stats(SoulLevel::ONE, vec![Stat::flat("Attack Power", 10.0)])
            .with_stats(SoulLevel::THREE, vec![Stat::flat("Attack Power", 25.0)]);

        assert_eq!(soul.stats_for(SoulLevel::ONE)[0].value, 10.0);
        assert!(soul.stats_for(SoulLevel::TWO).is_empty());
        assert_eq!(soul.stats_for(SoulLevel::THREE)[0].value, 25.0);
    }
}
