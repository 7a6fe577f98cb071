//! # Aggregation Engine
//!
//! Folds equipped souls over the tree into one total per stat name.
//!
//! For every node with a soul and a level above 0, the soul's stat block
//! for its soul level is scaled by the node's level bonus. Bonuses are
//! summed unrounded and each total is rounded once at the end, so the
//! result does not depend on the order nodes are visited.

use crate::catalog::Catalog;
use crate::scaling::{level_bonus, raw_level_bonus, round_stat};
use crate::souls::SoulRoster;
use crate::{NodeId, TreeState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated value of one stat across the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatTotal {
    pub name: String,
    pub value: f64,
    #[serde(rename = "isPercent", alias = "is_percent")]
    pub is_percent: bool,
}

/// Sum stat bonuses over every active node with a known soul.
///
/// Returns totals sorted by stat name.
#[must_use]
pub fn compute_totals(catalog: &Catalog, state: &TreeState, souls: &SoulRoster) -> Vec<StatTotal> {
    let mut totals: BTreeMap<&str, (f64, bool)> = BTreeMap::new();

    for (node, soul_id) in &state.equipped_soul_of {
        let level = state.level_of(*node);
        if level == 0 {
            continue;
        }
        let (Some(def), Some(soul)) = (catalog.get(*node), souls.get(soul_id)) else {
            continue;
        };
        let soul_level = state.soul_level(*node).unwrap_or_default();

        for stat in soul.stats_for(soul_level) {
            let bonus = raw_level_bonus(stat.value, level, def.rarity);
            let entry = totals.entry(stat.name.as_str()).or_insert((0.0, stat.is_percent));
            entry.0 += bonus;
            entry.1 = stat.is_percent;
        }
    }

    totals
        .into_iter()
        .map(|(name, (value, is_percent))| StatTotal {
            name: name.to_string(),
            value: round_stat(value),
            is_percent,
        })
        .collect()
}

/// Rounded per-stat bonuses contributed by a single node.
///
/// Empty when the node has no soul, level 0, or an unknown soul.
#[must_use]
pub fn node_contributions(
    catalog: &Catalog,
    state: &TreeState,
    souls: &SoulRoster,
    node: NodeId,
) -> Vec<StatTotal> {
    let level = state.level_of(node);
    let (Some(def), Some(soul)) = (
        catalog.get(node),
        state.soul_on(node).and_then(|id| souls.get(id)),
    ) else {
        return Vec::new();
    };
    if level == 0 {
        return Vec::new();
    }

    soul.stats_for(state.soul_level(node).unwrap_or_default())
        .iter()
        .map(|stat| StatTotal {
            name: stat.name.clone(),
            value: level_bonus(stat.value, level, def.rarity),
            is_percent: stat.is_percent,
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
