//! # Allocation Engine
//!
//! Owns the mutable [`TreeState`] and the point [`Budget`], and validates
//! every change against the [`Catalog`].
//!
//! Rules:
//! - Spending never exceeds the budget through `set_level`
//! - A node can only be raised from 0 when it is a root or one of its
//!   parents is active
//! - A node cannot drop to 0 while an active child has no other active
//!   parent
//! - A soul sits on at most one node at a time
//!
//! Every operation either fully succeeds or leaves the state untouched.

use crate::catalog::Catalog;
use crate::scaling::cost_per_level;
use crate::{Budget, FusionError, NodeId, SoulId, SoulLevel, TreeState};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validating owner of one tree allocation.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    catalog: Arc<Catalog>,
    state: TreeState,
    budget: Budget,
}

impl AllocationEngine {
    /// Create an engine with an empty allocation.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, budget: Budget) -> Self {
        Self {
            catalog,
            state: TreeState::new(),
            budget,
        }
    }

    /// Create an engine around an existing allocation.
    ///
    /// The state is trusted beyond shape: unknown nodes and zero levels are
    /// dropped and the key invariant is restored, but rules are not checked.
    #[must_use]
    pub fn with_state(catalog: Arc<Catalog>, budget: Budget, mut state: TreeState) -> Self {
        sanitize(&catalog, &mut state);
        Self {
            catalog,
            state,
            budget,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn state(&self) -> &TreeState {
        &self.state
    }

    #[must_use]
    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Points currently spent.
    #[must_use]
    pub fn used_points(&self) -> i64 {
        self.catalog.used_points(&self.state)
    }

    /// Budget minus spent points. Negative after the budget is lowered
    /// below current spending.
    #[must_use]
    pub fn remaining_points(&self) -> i64 {
        i64::from(self.budget.value()) - self.used_points()
    }

    /// Check if `node` may be raised from 0 under `levels`.
    ///
    /// Roots are always unlockable; any other node needs at least one
    /// parent above level 0.
    #[must_use]
    pub fn is_unlockable(&self, node: NodeId, levels: &BTreeMap<NodeId, u32>) -> bool {
        let Some(def) = self.catalog.get(node) else {
            return false;
        };
        def.is_root()
            || def
                .parents
                .iter()
                .any(|parent| levels.get(parent).copied().unwrap_or(0) > 0)
    }

    /// Set the level of a node.
    ///
    /// Checks run in order: `InvalidLevel`, no-op on zero delta,
    /// `InsufficientPoints`, `NodeLocked`, `ChildrenDependOnNode`.
    pub fn set_level(&mut self, node: NodeId, new_level: i64) -> Result<&TreeState, FusionError> {
        let def = self.catalog.node(node)?;
        let target = u32::try_from(new_level).map_err(|_| {
            tracing::debug!(%node, new_level, "rejected level out of range");
            FusionError::InvalidLevel {
                node: Some(node),
                level: new_level,
            }
        })?;

        let current = self.state.level_of(node);
        let delta = i64::from(target) - i64::from(current);
        if delta == 0 {
            return Ok(&self.state);
        }

        if delta > 0 {
            let needed = delta * i64::from(cost_per_level(def.rarity));
            let remaining = self.remaining_points();
            if remaining < needed {
                tracing::debug!(%node, needed, remaining, "rejected level increase");
                return Err(FusionError::InsufficientPoints { needed, remaining });
            }
            if current == 0 && !self.is_unlockable(node, &self.state.node_levels) {
                tracing::debug!(%node, "rejected level increase on locked node");
                return Err(FusionError::NodeLocked(node));
            }
        } else if target == 0 {
            if let Some(child) = self.orphaned_child(node) {
                tracing::debug!(%node, %child, "rejected level drop with dependent child");
                return Err(FusionError::ChildrenDependOnNode { node, child });
            }
        }

        if target == 0 {
            self.state.node_levels.remove(&node);
        } else {
            self.state.node_levels.insert(node, target);
        }
        Ok(&self.state)
    }

    /// First active child whose only active parent is `node`.
    fn orphaned_child(&self, node: NodeId) -> Option<NodeId> {
        let levels = &self.state.node_levels;
        self.catalog.children_of(node).find(|child| {
            if levels.get(child).copied().unwrap_or(0) == 0 {
                return false;
            }
            let other_active = self.catalog.get(*child).is_some_and(|def| {
                def.parents
                    .iter()
                    .any(|p| *p != node && levels.get(p).copied().unwrap_or(0) > 0)
            });
            !other_active
        })
    }

    /// Equip a soul on a node at soul level 1.
    ///
    /// Re-equipping the soul on the node that already holds it resets the
    /// soul level.
    pub fn equip(&mut self, node: NodeId, soul: SoulId) -> Result<&TreeState, FusionError> {
        self.catalog.node(node)?;
        if let Some(holder) = self.state.node_holding(&soul)
            && holder != node
        {
            tracing::debug!(%node, %soul, %holder, "rejected equip of soul held elsewhere");
            return Err(FusionError::SoulAlreadyEquipped { soul, node: holder });
        }
        self.state.equipped_soul_of.insert(node, soul);
        self.state.soul_level_of.insert(node, SoulLevel::ONE);
        Ok(&self.state)
    }

    /// Remove the soul from a node. No-op when nothing is equipped.
    pub fn unequip(&mut self, node: NodeId) -> &TreeState {
        self.state.equipped_soul_of.remove(&node);
        self.state.soul_level_of.remove(&node);
        &self.state
    }

    /// Set the level of the soul on a node. No-op when nothing is equipped.
    pub fn set_soul_level(&mut self, node: NodeId, level: SoulLevel) -> &TreeState {
        if self.state.equipped_soul_of.contains_key(&node) {
            self.state.soul_level_of.insert(node, level);
        }
        &self.state
    }

    /// Replace the budget, clamping negative values to 0.
    ///
    /// Existing spending is not revalidated.
    pub fn set_budget(&mut self, value: i64) -> Budget {
        self.budget = Budget::clamped(value);
        self.budget
    }

    /// Clear all levels and equipped souls.
    pub fn reset(&mut self) -> &TreeState {
        self.state = TreeState::new();
        &self.state
    }

    /// Unequip a soul from every node holding it. Returns the affected nodes.
    pub fn unequip_soul_everywhere(&mut self, soul: &SoulId) -> Vec<NodeId> {
        let nodes: Vec<NodeId> = self
            .state
            .equipped_soul_of
            .iter()
            .filter(|(_, equipped)| *equipped == soul)
            .map(|(node, _)| *node)
            .collect();
        for node in &nodes {
            self.unequip(*node);
        }
        nodes
    }

    /// Replace the whole allocation without rule checks.
    pub fn restore(&mut self, mut state: TreeState) -> &TreeState {
        sanitize(&self.catalog, &mut state);
        self.state = state;
        &self.state
    }

    /// Check that a snapshot fits the current budget.
    pub fn validate_budget(&self, state: &TreeState) -> Result<(), FusionError> {
        let used = self.catalog.used_points(state);
        if used > i64::from(self.budget.value()) {
            return Err(FusionError::OverBudgetSnapshot {
                used,
                budget: self.budget.value(),
            });
        }
        Ok(())
    }
}

/// Drop entries for nodes the catalog does not define, then normalize.
fn sanitize(catalog: &Catalog, state: &mut TreeState) {
    let before = state.node_levels.len() + state.equipped_soul_of.len();
    state.node_levels.retain(|node, _| catalog.contains(*node));
    state.equipped_soul_of.retain(|node, _| catalog.contains(*node));
    state.soul_level_of.retain(|node, _| catalog.contains(*node));
    let dropped = before - state.node_levels.len() - state.equipped_soul_of.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Dropped entries for unknown nodes");
    }
    state.normalize();
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NodeDef;
    use crate::{Rarity, Tag};

    fn engine(budget: u32) -> AllocationEngine {
        AllocationEngine::new(Arc::new(Catalog::fusion_tree()), Budget(budget))
    }

    #[test]
    fn set_level_spends_points() {
        let mut engine = engine(10);
        engine.set_level(NodeId(1), 3).expect("root level");

        assert_eq!(engine.state().level_of(NodeId(1)), 3);
        assert_eq!(engine.used_points(), 3);
        assert_eq!(engine.remaining_points(), 7);
    }

    #[test]
    fn negative_level_rejected() {
        let mut engine = engine(10);
        let err = engine.set_level(NodeId(1), -1).expect_err("negative");

        assert_eq!(
            err,
            FusionError::InvalidLevel {
                node: Some(NodeId(1)),
                level: -1
            }
        );
    }

    #[test]
    fn unknown_node_rejected() {
        let mut engine = engine(10);
        assert_eq!(
            engine.set_level(NodeId(99), 1).expect_err("unknown"),
            FusionError::UnknownNode(NodeId(99))
        );
    }

    #[test]
    fn budget_checked_before_lock() {
        let mut engine = engine(1);
        // Node 3 is Rare (cost 2) and locked; the budget error wins.
        let err = engine.set_level(NodeId(3), 1).expect_err("over budget");

        assert_eq!(
            err,
            FusionError::InsufficientPoints {
                needed: 2,
                remaining: 1
            }
        );
    }

    #[test]
    fn locked_node_rejected() {
        let mut engine = engine(10);
        assert_eq!(
            engine.set_level(NodeId(2), 1).expect_err("locked"),
            FusionError::NodeLocked(NodeId(2))
        );
    }

    #[test]
    fn decrease_to_zero_protects_only_child_path() {
        let mut engine = engine(10);
        engine.set_level(NodeId(1), 1).expect("root");
        engine.set_level(NodeId(2), 1).expect("child");

        assert_eq!(
            engine.set_level(NodeId(1), 0).expect_err("orphan"),
            FusionError::ChildrenDependOnNode {
                node: NodeId(1),
                child: NodeId(2)
            }
        );
        assert_eq!(engine.state().level_of(NodeId(1)), 1);
    }

    #[test]
    fn decrease_keeps_dependency_when_above_zero() {
        let mut engine = engine(10);
        engine.set_level(NodeId(1), 3).expect("root");
        engine.set_level(NodeId(2), 1).expect("child");
        engine.set_level(NodeId(1), 1).expect("partial decrease");

        assert_eq!(engine.state().level_of(NodeId(1)), 1);
    }

    #[test]
    fn child_with_second_active_parent_does_not_block() {
        let catalog = Catalog::new(vec![
            NodeDef::new(1, Rarity::Common, Tag::Attack, &[]),
            NodeDef::new(2, Rarity::Common, Tag::Attack, &[]),
            NodeDef::new(3, Rarity::Common, Tag::Attack, &[1, 2]),
        ])
        .expect("catalog");
        let mut engine = AllocationEngine::new(Arc::new(catalog), Budget(10));
        engine.set_level(NodeId(1), 1).expect("a");
        engine.set_level(NodeId(2), 1).expect("b");
        engine.set_level(NodeId(3), 1).expect("c");

        engine.set_level(NodeId(1), 0).expect("b still feeds c");
        assert_eq!(engine.state().level_of(NodeId(1)), 0);
    }

    #[test]
    fn zero_delta_is_noop_even_when_over_budget() {
        let mut engine = engine(10);
        engine.set_level(NodeId(1), 5).expect("root");
        engine.set_budget(2);

        let before = engine.state().clone();
        engine.set_level(NodeId(1), 5).expect("no-op");
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn equip_rejects_soul_held_elsewhere() {
        let mut engine = engine(10);
        engine.equip(NodeId(1), SoulId::from("s1")).expect("equip");

        assert_eq!(
            engine.equip(NodeId(2), SoulId::from("s1")).expect_err("held"),
            FusionError::SoulAlreadyEquipped {
                soul: SoulId::from("s1"),
                node: NodeId(1)
            }
        );
    }

    #[test]
    fn equip_resets_soul_level() {
        let mut engine = engine(10);
        engine.equip(NodeId(1), SoulId::from("s1")).expect("equip");
        engine.set_soul_level(NodeId(1), SoulLevel::THREE);
        engine.equip(NodeId(1), SoulId::from("s1")).expect("re-equip");

        assert_eq!(engine.state().soul_level(NodeId(1)), Some(SoulLevel::ONE));
    }

    #[test]
    fn set_soul_level_without_soul_is_noop() {
        let mut engine = engine(10);
        engine.set_soul_level(NodeId(1), SoulLevel::TWO);

        assert!(engine.state().is_consistent());
        assert_eq!(engine.state().soul_level(NodeId(1)), None);
    }

    #[test]
    fn unequip_removes_both_entries() {
        let mut engine = engine(10);
        engine.equip(NodeId(4), SoulId::from("s2")).expect("equip");
        engine.unequip(NodeId(4));

        assert!(engine.state().equipped_soul_of.is_empty());
        assert!(engine.state().soul_level_of.is_empty());
    }

    #[test]
    fn set_budget_clamps_negative() {
        let mut engine = engine(10);
        assert_eq!(engine.set_budget(-4), Budget(0));
    }

    #[test]
    fn reset_clears_everything() {
        let mut engine = engine(10);
        engine.set_level(NodeId(1), 2).expect("root");
        engine.equip(NodeId(1), SoulId::from("s1")).expect("equip");
        engine.reset();

        assert!(engine.state().is_empty());
        assert_eq!(engine.used_points(), 0);
    }

    #[test]
    fn validate_budget_flags_over_budget_snapshot() {
        let engine = engine(2);
        let mut snapshot = TreeState::new();
        snapshot.node_levels.insert(NodeId(1), 3);

        assert_eq!(
            engine.validate_budget(&snapshot),
            Err(FusionError::OverBudgetSnapshot { used: 3, budget: 2 })
        );
    }

    #[test]
    fn restore_drops_unknown_and_zero_level_nodes() {
        let mut engine = engine(10);
        let mut state = TreeState::new();
        state.node_levels.insert(NodeId(0), 0);
        state.node_levels.insert(NodeId(1), 0);
        state.node_levels.insert(NodeId(2), 1);
        state.node_levels.insert(NodeId(999), 2);
        state.equipped_soul_of.insert(NodeId(999), SoulId::from("s1"));
        state.soul_level_of.insert(NodeId(999), SoulLevel::TWO);

        let restored = engine.restore(state);

        assert_eq!(restored.node_levels.len(), 1);
        assert_eq!(restored.level_of(NodeId(2)), 1);
        assert!(restored.equipped_soul_of.is_empty());
        assert!(restored.soul_level_of.is_empty());
    }

    #[test]
    fn with_state_drops_unknown_nodes() {
        let mut state = TreeState::new();
        state.node_levels.insert(NodeId(999), 4);
        state.node_levels.insert(NodeId(1), 2);

        let engine = AllocationEngine::with_state(
            Arc::new(Catalog::fusion_tree()),
            Budget(10),
            state,
        );

        assert_eq!(engine.state().node_levels.len(), 1);
        assert_eq!(engine.used_points(), 2);
    }
}
