//! # Allocation Scenarios
//!
//! End-to-end behavior of the engine through its public API.
//!
//! ## Groups
//! - Scaling: cost and bonus reference values
//! - Unlocking: parent gating and orphan protection
//! - Souls: compatibility, equip uniqueness, deletion cascade
//! - Aggregation: single rounding
//! - Backup: export/import round trip

use fusion_core::{
    AllocationEngine, Budget, Catalog, FusionError, NodeDef, NodeId, Planner, Rarity, Soul,
    SoulId, SoulLevel, SoulRoster, Stat, Tag, TreeState, can_equip, compute_totals,
    cost_per_level, level_bonus,
};
use std::sync::Arc;

const A: NodeId = NodeId(1);
const B: NodeId = NodeId(2);
const C: NodeId = NodeId(3);

/// A (root) with children B and C, each listing A as sole parent.
fn fork_catalog() -> Arc<Catalog> {
    Arc::new(
        Catalog::new(vec![
            NodeDef::new(1, Rarity::Common, Tag::Attack, &[]),
            NodeDef::new(2, Rarity::Common, Tag::Attack, &[1]),
            NodeDef::new(3, Rarity::Common, Tag::Defense, &[1]),
        ])
        .expect("valid catalog"),
    )
}

// =============================================================================
// SCALING
// =============================================================================

mod scaling {
    use super::*;

    #[test]
    fn cost_strictly_increasing() {
        let costs: Vec<u32> = Rarity::ALL.iter().map(|r| cost_per_level(*r)).collect();
        assert_eq!(costs, vec![1, 2, 3]);
    }

    #[test]
    fn bonus_reference_values() {
        assert_eq!(level_bonus(10.0, 1, Rarity::Common), 10.0);
        assert_eq!(level_bonus(10.0, 21, Rarity::Legendary), 35.07);
        assert_eq!(level_bonus(10.0, 0, Rarity::Rare), 0.0);
    }
}

// =============================================================================
// UNLOCKING
// =============================================================================

mod unlocking {
    use super::*;

    #[test]
    fn lock_check() {
        let mut engine = AllocationEngine::new(fork_catalog(), Budget(10));

        assert_eq!(
            engine.set_level(B, 1).map(|_| ()),
            Err(FusionError::NodeLocked(B))
        );
        engine.set_level(A, 1).expect("root unlocks");
        engine.set_level(B, 1).expect("child unlocks once parent is active");

        assert_eq!(engine.used_points(), 2);
    }

    #[test]
    fn orphan_protection() {
        let mut engine = AllocationEngine::new(fork_catalog(), Budget(10));
        engine.set_level(A, 1).expect("a");
        engine.set_level(B, 1).expect("b");
        engine.set_level(C, 1).expect("c");

        assert!(matches!(
            engine.set_level(A, 0),
            Err(FusionError::ChildrenDependOnNode { node, .. }) if node == A
        ));

        engine.set_level(B, 0).expect("b down");
        assert_eq!(
            engine.set_level(A, 0).map(|_| ()),
            Err(FusionError::ChildrenDependOnNode { node: A, child: C })
        );

        engine.set_level(C, 0).expect("c down");
        engine.set_level(A, 0).expect("a down");
        assert!(engine.state().is_empty());
    }

    #[test]
    fn rejected_operation_leaves_state_untouched() {
        let mut engine = AllocationEngine::new(fork_catalog(), Budget(3));
        engine.set_level(A, 2).expect("a");
        let before = engine.state().clone();

        assert!(engine.set_level(A, 9).is_err());
        assert!(engine.set_level(A, -2).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn delta_zero_is_idempotent() {
        let mut engine = AllocationEngine::new(fork_catalog(), Budget(5));
        engine.set_level(A, 3).expect("a");
        let used = engine.used_points();

        for _ in 0..3 {
            engine.set_level(A, 3).expect("no-op");
        }
        assert_eq!(engine.used_points(), used);
    }

    #[test]
    fn full_fusion_tree_path_to_legendary() {
        let mut planner = Planner::new();
        planner.set_budget(1000);

        for id in [1, 2, 3].into_iter().chain(4..=15) {
            planner.set_level(NodeId(id), 1).expect("walk left branch");
        }

        // Trunk 1+1+2, left branch 9 Common + 2 Rare + 1 Legendary.
        assert_eq!(planner.summary().used, 20);
    }
}

// =============================================================================
// SOULS
// =============================================================================

mod souls {
    use super::*;

    #[test]
    fn common_attack_soul_compatibility() {
        let soul = Soul::new("Wolf", Rarity::Common, vec![Tag::Attack]);

        for rarity in Rarity::ALL {
            for tag in Tag::ALL {
                let node = NodeDef::new(1, rarity, tag, &[]);
                let expected =
                    rarity == Rarity::Common && matches!(tag, Tag::Attack | Tag::Wildcard);
                assert_eq!(can_equip(&node, &soul), expected, "{rarity} {tag}");
            }
        }
    }

    #[test]
    fn soul_equipped_once() {
        let mut planner = Planner::new();
        planner.equip(NodeId(1), SoulId::from("s3")).expect("light on 1");

        assert_eq!(
            planner.equip(NodeId(15), SoulId::from("s3")).map(|_| ()),
            Err(FusionError::SoulAlreadyEquipped {
                soul: SoulId::from("s3"),
                node: NodeId(1)
            })
        );
    }

    #[test]
    fn deletion_cascade_keeps_node_level() {
        let mut planner = Planner::new();
        planner.set_level(NodeId(1), 4).expect("level");
        planner.equip(NodeId(1), SoulId::from("s1")).expect("equip");
        planner.set_soul_level(NodeId(1), SoulLevel::THREE);

        planner.delete_soul(&SoulId::from("s1")).expect("delete");

        let state = planner.state();
        assert_eq!(state.soul_on(NodeId(1)), None);
        assert_eq!(state.soul_level(NodeId(1)), None);
        assert_eq!(state.level_of(NodeId(1)), 4);
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

mod aggregation {
    use super::*;

    #[test]
    fn totals_round_once_not_per_soul() {
        let catalog = fork_catalog();
        let soul = |id: &str| {
            Soul::new(id, Rarity::Common, vec![Tag::Wildcard])
                .with_id(id)
                .with_stats(SoulLevel::ONE, vec![Stat::flat("Crit", 1.0)])
        };
        let roster = SoulRoster::from_souls(vec![soul("x"), soul("y")]);

        let mut engine = AllocationEngine::new(catalog.clone(), Budget(10));
        engine.set_level(A, 2).expect("a");
        engine.set_level(B, 2).expect("b");
        engine.equip(A, SoulId::from("x")).expect("x");
        engine.equip(B, SoulId::from("y")).expect("y");

        let totals = compute_totals(&catalog, engine.state(), &roster);
        let per_soul_rounded = 2.0 * level_bonus(1.0, 2, Rarity::Common);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].value, 2.25);
        assert_ne!(totals[0].value, per_soul_rounded);
    }

    #[test]
    fn totals_independent_of_summand_order() {
        let catalog = Catalog::fusion_tree();
        let soul = |id: &str, value: f64| {
            Soul::new(id, Rarity::Common, vec![Tag::Attack])
                .with_id(id)
                .with_stats(SoulLevel::ONE, vec![Stat::flat("Attack Power", value)])
        };
        let roster =
            SoulRoster::from_souls(vec![soul("a", 0.1), soul("b", 0.2), soul("c", 0.3)]);

        // Level 1 keeps each bonus equal to its base, so node id order is
        // the summation order: 0.1 + 0.2 + 0.3 against 0.3 + 0.2 + 0.1.
        let place = |souls: [&str; 3]| {
            let mut state = TreeState::new();
            for (node, soul) in [1, 4, 5].into_iter().zip(souls) {
                state.node_levels.insert(NodeId(node), 1);
                state.equipped_soul_of.insert(NodeId(node), SoulId::from(soul));
            }
            state.normalize();
            compute_totals(&catalog, &state, &roster)
        };

        let ascending = place(["a", "b", "c"]);
        let descending = place(["c", "b", "a"]);

        assert_ne!(0.1 + 0.2 + 0.3, 0.3 + 0.2 + 0.1);
        assert_eq!(ascending, descending);
        assert_eq!(ascending[0].value, 0.6);
    }
}

// =============================================================================
// BACKUP
// =============================================================================

mod backup {
    use super::*;

    #[test]
    fn export_import_round_trip() {
        let mut source = Planner::new();
        source.set_budget(60);
        source.set_level(NodeId(1), 3).expect("level");
        source.equip(NodeId(1), SoulId::from("s1")).expect("equip");
        source.set_soul_level(NodeId(1), SoulLevel::TWO);
        source.save_preset(2, Some("Opener".to_string())).expect("preset");
        source
            .save_soul(
                Soul::new("Owl", Rarity::Rare, vec![Tag::Utility])
                    .with_id("owl")
                    .with_stats(SoulLevel::ONE, vec![Stat::percent("Speed", 3.5)]),
            )
            .expect("soul");

        let bytes = source.export_bytes().expect("export");
        let mut target = Planner::new();
        target.import_bytes(&bytes).expect("import");

        assert_eq!(target.state(), source.state());
        assert_eq!(target.souls(), source.souls());
        assert_eq!(target.presets(), source.presets());
        assert_eq!(target.budget(), source.budget());
    }

    #[test]
    fn import_restores_without_budget_check() {
        let mut planner = Planner::new();
        planner
            .import_bytes(br#"{"treeState":{"nodeLevels":{"1":50}},"userFusionLevel":10}"#)
            .expect("import");

        assert_eq!(planner.summary().remaining, -40);
    }
}
