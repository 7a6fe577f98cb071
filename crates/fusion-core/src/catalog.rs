//! # Graph Catalog
//!
//! The static definition of the fusion tree: every node with its rarity,
//! tag and parent set.
//!
//! A `Catalog` is immutable once built and acts as the schema the rest of
//! the engine validates against. The parent-to-children index is derived
//! once at construction, since the structure never changes afterwards.
//!
//! All data structures use `BTreeMap` for deterministic ordering.

use crate::{FusionError, NodeId, Rarity, Tag, TreeState};
use crate::scaling::cost_per_level;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// NODE DEFINITION
// =============================================================================

/// A node definition in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: NodeId,
    pub rarity: Rarity,
    pub tag: Tag,
    /// Prerequisite nodes. Empty only for roots.
    pub parents: BTreeSet<NodeId>,
}

impl NodeDef {
    /// Create a node definition.
    #[must_use]
    pub fn new(id: u32, rarity: Rarity, tag: Tag, parents: &[u32]) -> Self {
        Self {
            id: NodeId(id),
            rarity,
            tag,
            parents: parents.iter().copied().map(NodeId).collect(),
        }
    }

    /// Check if the node has no prerequisites.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// The immutable node catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Node storage: NodeId -> NodeDef
    nodes: BTreeMap<NodeId, NodeDef>,

    /// Reverse index: parent -> children listing it as a parent
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Catalog {
    /// Build a catalog from node definitions, validating its structure.
    ///
    /// Rejects duplicate ids, parents that do not exist, self-parents and
    /// cycles. In an acyclic graph whose parents all exist, every node is
    /// reachable from some root.
    pub fn new(defs: Vec<NodeDef>) -> Result<Self, FusionError> {
        let mut nodes = BTreeMap::new();
        for def in defs {
            let id = def.id;
            if nodes.insert(id, def).is_some() {
                return Err(FusionError::InvalidCatalog(format!("duplicate node id {}", id)));
            }
        }

        for def in nodes.values() {
            for parent in &def.parents {
                if *parent == def.id {
                    return Err(FusionError::InvalidCatalog(format!(
                        "node {} lists itself as a parent",
                        def.id
                    )));
                }
                if !nodes.contains_key(parent) {
                    return Err(FusionError::InvalidCatalog(format!(
                        "node {} has unknown parent {}",
                        def.id, parent
                    )));
                }
            }
        }

        let catalog = Self::build(nodes);
        catalog.check_acyclic()?;
        Ok(catalog)
    }

    /// Index an already-validated node map.
    fn build(nodes: BTreeMap<NodeId, NodeDef>) -> Self {
        let mut children: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for def in nodes.values() {
            for parent in &def.parents {
                children.entry(*parent).or_default().insert(def.id);
            }
        }
        Self { nodes, children }
    }

    /// Kahn's algorithm: every node must be consumed, starting from roots.
    fn check_acyclic(&self) -> Result<(), FusionError> {
        let mut pending: BTreeMap<NodeId, usize> = self
            .nodes
            .values()
            .map(|def| (def.id, def.parents.len()))
            .collect();
        let mut queue: VecDeque<NodeId> = self.roots().map(|def| def.id).collect();
        let mut visited = 0usize;

        while let Some(current) = queue.pop_front() {
            visited += 1;
            for child in self.children_of(current) {
                if let Some(remaining) = pending.get_mut(&child) {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            return Err(FusionError::InvalidCatalog(
                "parent relation contains a cycle".to_string(),
            ));
        }
        Ok(())
    }

    /// The built-in 34-node fusion tree.
    ///
    /// A single root leads to a Rare Wildcard hub (node 3) that splits into
    /// a left Attack branch, a right Defense branch and a center branch
    /// running through Utility into PvP. Each branch ends in a Legendary node.
    #[must_use]
    pub fn fusion_tree() -> Self {
        use Rarity::{Common, Legendary, Rare};
        use Tag::{Attack, Defense, PvP, Utility, Wildcard};

        let defs = [
            // Trunk
            NodeDef::new(1, Common, Attack, &[]),
            NodeDef::new(2, Common, Defense, &[1]),
            NodeDef::new(3, Rare, Wildcard, &[2]),
            // Left branch
            NodeDef::new(4, Common, Attack, &[3]),
            NodeDef::new(5, Common, Attack, &[4]),
            NodeDef::new(6, Rare, Attack, &[5]),
            NodeDef::new(7, Common, Defense, &[6]),
            NodeDef::new(8, Common, Attack, &[7]),
            NodeDef::new(9, Rare, Attack, &[8]),
            NodeDef::new(10, Common, Attack, &[9]),
            NodeDef::new(11, Common, Defense, &[10]),
            NodeDef::new(12, Common, Utility, &[11]),
            NodeDef::new(13, Common, Attack, &[12]),
            NodeDef::new(14, Common, Attack, &[13]),
            NodeDef::new(15, Legendary, Attack, &[14]),
            // Right branch
            NodeDef::new(16, Common, Defense, &[3]),
            NodeDef::new(17, Common, Defense, &[16]),
            NodeDef::new(18, Rare, Defense, &[17]),
            NodeDef::new(19, Common, Attack, &[18]),
            NodeDef::new(20, Common, Defense, &[19]),
            NodeDef::new(21, Rare, Defense, &[20]),
            NodeDef::new(22, Common, Defense, &[21]),
            NodeDef::new(23, Common, Attack, &[22]),
            NodeDef::new(24, Common, Utility, &[23]),
            NodeDef::new(25, Common, Defense, &[24]),
            NodeDef::new(26, Common, Defense, &[25]),
            NodeDef::new(27, Legendary, Defense, &[26]),
            // Center branch
            NodeDef::new(28, Common, Utility, &[3]),
            NodeDef::new(29, Legendary, Utility, &[28]),
            NodeDef::new(30, Common, Defense, &[29]),
            NodeDef::new(31, Common, PvP, &[30]),
            NodeDef::new(32, Rare, PvP, &[31]),
            NodeDef::new(33, Common, PvP, &[32]),
            NodeDef::new(34, Legendary, PvP, &[33]),
        ];

        Self::build(defs.into_iter().map(|def| (def.id, def)).collect())
    }

    /// Lookup a node definition.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeDef> {
        self.nodes.get(&id)
    }

    /// Lookup a node definition, failing with `UnknownNode`.
    pub fn node(&self, id: NodeId) -> Result<&NodeDef, FusionError> {
        self.nodes.get(&id).ok_or(FusionError::UnknownNode(id))
    }

    /// Check if the catalog contains a node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All node definitions in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDef> {
        self.nodes.values()
    }

    /// Root nodes in id order.
    pub fn roots(&self) -> impl Iterator<Item = &NodeDef> {
        self.nodes.values().filter(|def| def.is_root())
    }

    /// Nodes that list `id` among their parents.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children.get(&id).into_iter().flatten().copied()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the catalog has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Points spent by a state: `Σ level × cost_per_level(rarity)`.
    ///
    /// Levels on ids outside the catalog cost nothing.
    #[must_use]
    pub fn used_points(&self, state: &TreeState) -> i64 {
        state
            .node_levels
            .iter()
            .filter_map(|(id, level)| {
                self.get(*id)
                    .map(|def| i64::from(*level) * i64::from(cost_per_level(def.rarity)))
            })
            .sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fusion_tree_passes_validation() {
        let defs: Vec<NodeDef> = Catalog::fusion_tree().nodes().cloned().collect();
        let catalog = Catalog::new(defs).expect("built-in tree is valid");

        assert_eq!(catalog.len(), 34);
        assert_eq!(catalog.roots().count(), 1);
    }

    #[test]
    fn fusion_tree_hub_has_three_branches() {
        let catalog = Catalog::fusion_tree();
        let hub: Vec<_> = catalog.children_of(NodeId(3)).collect();

        assert_eq!(hub, vec![NodeId(4), NodeId(16), NodeId(28)]);
        assert_eq!(catalog.get(NodeId(3)).map(|n| n.tag), Some(Tag::Wildcard));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = Catalog::new(vec![
            NodeDef::new(1, Rarity::Common, Tag::Attack, &[]),
            NodeDef::new(1, Rarity::Rare, Tag::Defense, &[]),
        ]);
        assert!(matches!(result, Err(FusionError::InvalidCatalog(_))));
    }

    #[test]
    fn rejects_unknown_parent() {
        let result = Catalog::new(vec![NodeDef::new(2, Rarity::Common, Tag::Attack, &[9])]);
        assert!(matches!(result, Err(FusionError::InvalidCatalog(_))));
    }

    #[test]
    fn rejects_cycles() {
        let result = Catalog::new(vec![
            NodeDef::new(1, Rarity::Common, Tag::Attack, &[]),
            NodeDef::new(2, Rarity::Common, Tag::Attack, &[1, 3]),
            NodeDef::new(3, Rarity::Common, Tag::Attack, &[2]),
        ]);
        assert!(matches!(result, Err(FusionError::InvalidCatalog(_))));
    }

    #[test]
    fn rejects_self_parent() {
        let result = Catalog::new(vec![NodeDef::new(1, Rarity::Common, Tag::Attack, &[1])]);
        assert!(matches!(result, Err(FusionError::InvalidCatalog(_))));
    }

    #[test]
    fn used_points_weights_by_rarity() {
        let catalog = Catalog::fusion_tree();
        let mut state = TreeState::new();
        state.node_levels.insert(NodeId(1), 4); // Common: 4
        state.node_levels.insert(NodeId(3), 2); // Rare: 4
        state.node_levels.insert(NodeId(15), 1); // Legendary: 3
        state.node_levels.insert(NodeId(99), 50); // not in catalog

        assert_eq!(catalog.used_points(&state), 11);
    }
}
