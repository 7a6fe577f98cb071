//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use fusion::api::{
    BudgetRequest, HashResponse, HealthResponse, LevelRequest, NodeJson, PresetSaveRequest,
    SoulLevelRequest, SoulResponse, StateResponse, status_for,
};
use fusion_core::{BudgetSummary, Catalog, FusionError, NodeId, SoulId, SoulLevel, TreeState};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_level_request_accepts_negative_level() {
    let request: LevelRequest = serde_json::from_str(r#"{"node":4,"level":-2}"#).unwrap();
    assert_eq!(request.node, 4);
    assert_eq!(request.level, -2);
}

#[test]
fn test_budget_request_field_names() {
    let plain: BudgetRequest = serde_json::from_str(r#"{"value":25}"#).unwrap();
    let legacy: BudgetRequest = serde_json::from_str(r#"{"userFusionLevel":25}"#).unwrap();
    assert_eq!(plain.value, 25);
    assert_eq!(legacy.value, 25);
}

#[test]
fn test_preset_save_request_label_optional() {
    let bare: PresetSaveRequest = serde_json::from_str(r#"{"slot":2}"#).unwrap();
    assert_eq!(bare.slot, 2);
    assert!(bare.label.is_none());

    let named: PresetSaveRequest = serde_json::from_str(r#"{"slot":0,"name":"PvP"}"#).unwrap();
    assert_eq!(named.label.as_deref(), Some("PvP"));
}

#[test]
fn test_soul_level_request_range() {
    let ok = SoulLevelRequest { node: 1, level: 2 };
    assert_eq!(ok.soul_level().unwrap(), SoulLevel::TWO);

    let wide: SoulLevelRequest = serde_json::from_str(r#"{"node":1,"level":300}"#).unwrap();
    assert!(matches!(
        wide.soul_level(),
        Err(FusionError::InvalidLevel { level: 300, .. })
    ));

    for level in [0, 4, -1, 300, i64::MAX] {
        let bad = SoulLevelRequest { node: 1, level };
        assert!(matches!(
            bad.soul_level(),
            Err(FusionError::InvalidLevel { node: Some(NodeId(1)), .. })
        ));
    }
}

// =============================================================================
// RESPONSE TESTS
// =============================================================================

#[test]
fn test_state_response_uses_backup_field_names() {
    let mut state = TreeState::new();
    state.node_levels.insert(NodeId(1), 3);
    let summary = BudgetSummary {
        budget: 100,
        used: 3,
        remaining: 97,
    };

    let json = serde_json::to_string(&StateResponse::success(&state, summary)).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"nodeLevels\":{\"1\":3}"));
    assert!(json.contains("\"remaining\":97"));
}

#[test]
fn test_state_response_error() {
    let response = StateResponse::error("boom");
    assert!(!response.success);
    assert!(response.state.is_none());
    assert!(response.budget.is_none());
    assert_eq!(response.error.as_deref(), Some("boom"));
}

#[test]
fn test_node_json_from_catalog() {
    let catalog = Catalog::fusion_tree();
    let node = NodeJson::from(catalog.get(NodeId(3)).unwrap());

    assert_eq!(node.id, 3);
    assert_eq!(node.parents, vec![2]);
    assert_eq!(node.cost, 2);

    let json = serde_json::to_string(&node).unwrap();
    assert!(json.contains("\"rarity\":\"Rare\""));
    assert!(json.contains("\"tag\":\"Wildcard\""));
}

#[test]
fn test_soul_response_constructors() {
    let ok = SoulResponse::success("s1");
    assert!(ok.success);
    assert_eq!(ok.id.as_deref(), Some("s1"));

    let err = SoulResponse::error("nope");
    assert!(!err.success);
    assert!(err.id.is_none());
}

#[test]
fn test_hash_response_round_trip() {
    let hash = HashResponse {
        checksum: 42,
        blake3: "ab".repeat(32),
    };
    let json = serde_json::to_string(&hash).unwrap();
    let back: HashResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back.checksum, 42);
    assert_eq!(back.blake3.len(), 64);
}

// =============================================================================
// STATUS MAPPING TESTS
// =============================================================================

#[test]
fn test_status_for_not_found() {
    assert_eq!(
        status_for(&FusionError::UnknownNode(NodeId(99))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_for(&FusionError::UnknownSoul(SoulId::from("x"))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(status_for(&FusionError::EmptySlot(0)), StatusCode::NOT_FOUND);
}

#[test]
fn test_status_for_conflict_and_server_errors() {
    let conflict = FusionError::SoulAlreadyEquipped {
        soul: SoulId::from("s1"),
        node: NodeId(1),
    };
    assert_eq!(status_for(&conflict), StatusCode::CONFLICT);
    assert_eq!(
        status_for(&FusionError::IoError("disk".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_status_for_rule_violations() {
    let errors = [
        FusionError::NodeLocked(NodeId(3)),
        FusionError::InsufficientPoints {
            needed: 5,
            remaining: 1,
        },
        FusionError::ChildrenDependOnNode {
            node: NodeId(2),
            child: NodeId(3),
        },
        FusionError::InvalidSlot { slot: 9, count: 5 },
        FusionError::MalformedImport("bad".to_string()),
        FusionError::OverBudgetSnapshot {
            used: 10,
            budget: 5,
        },
    ];
    for error in &errors {
        assert_eq!(status_for(error), StatusCode::BAD_REQUEST, "{error}");
    }
}
