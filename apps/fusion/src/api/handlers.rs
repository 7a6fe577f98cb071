//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Reads take the planner read lock; every mutation takes the write lock,
//! so mutations are serialized.

use super::{
    AppState,
    types::{
        ApiJson, BudgetRequest, CatalogResponse, EquipRequest, HashResponse, HealthResponse,
        LevelRequest, NodeJson, NodeRequest, PresetLoadRequest, PresetResponse,
        PresetSaveRequest, SoulDeleteRequest, SoulLevelRequest, SoulResponse, StateResponse,
        StatsResponse, status_for,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use fusion_core::{
    FusionError, NodeId, Planner, Preset, Soul, SoulId, backup_checksum, compute_blake3_hash,
    export_document,
};

/// Build the standard state response after a tree change.
fn state_result(
    planner: &Planner,
    result: Result<(), FusionError>,
) -> (StatusCode, Json<StateResponse>) {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(StateResponse::success(planner.state(), planner.summary())),
        ),
        Err(e) => (status_for(&e), Json(StateResponse::error(e.to_string()))),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// READ HANDLERS
// =============================================================================

/// Current tree state and budget usage.
pub async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    state_result(&planner, Ok(()))
}

/// Aggregated stat totals.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    let response = StatsResponse {
        totals: planner.totals(),
        budget: planner.summary(),
    };
    (StatusCode::OK, Json(response))
}

/// The node catalog.
pub async fn catalog_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    let nodes = planner.catalog().nodes().map(NodeJson::from).collect();
    (StatusCode::OK, Json(CatalogResponse { nodes }))
}

/// The soul roster.
pub async fn souls_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    let souls: Vec<Soul> = planner.souls().iter().cloned().collect();
    (StatusCode::OK, Json(souls))
}

/// All preset slots; empty slots are `null`.
pub async fn presets_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    let slots: Vec<Option<Preset>> = planner.presets().slots().to_vec();
    (StatusCode::OK, Json(slots))
}

// =============================================================================
// TREE MUTATION HANDLERS
// =============================================================================

/// Set a node's level.
pub async fn level_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LevelRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    let result = planner
        .set_level(NodeId(request.node), request.level)
        .map(|_| ());
    state_result(&planner, result)
}

/// Equip a soul on a node.
pub async fn equip_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EquipRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    let result = planner
        .equip(NodeId(request.node), SoulId::new(request.soul))
        .map(|_| ());
    state_result(&planner, result)
}

/// Remove the soul from a node.
pub async fn unequip_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NodeRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    planner.unequip(NodeId(request.node));
    state_result(&planner, Ok(()))
}

/// Set the level of an equipped soul.
pub async fn soul_level_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SoulLevelRequest>,
) -> impl IntoResponse {
    let level = match request.soul_level() {
        Ok(level) => level,
        Err(e) => return (status_for(&e), Json(StateResponse::error(e.to_string()))),
    };

    let mut planner = state.planner.write().await;
    planner.set_soul_level(NodeId(request.node), level);
    state_result(&planner, Ok(()))
}

/// Replace the point budget.
pub async fn budget_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BudgetRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    planner.set_budget(request.value);
    state_result(&planner, Ok(()))
}

/// Clear the tree.
pub async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    planner.reset();
    state_result(&planner, Ok(()))
}

// =============================================================================
// SOUL HANDLERS
// =============================================================================

/// Add or replace a soul.
pub async fn save_soul_handler(
    State(state): State<AppState>,
    ApiJson(soul): ApiJson<Soul>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    match planner.save_soul(soul) {
        Ok(id) => (StatusCode::OK, Json(SoulResponse::success(id.as_str()))),
        Err(e) => (status_for(&e), Json(SoulResponse::error(e.to_string()))),
    }
}

/// Delete a soul and unequip it everywhere.
pub async fn delete_soul_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SoulDeleteRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    match planner.delete_soul(&SoulId::new(request.id)) {
        Ok(soul) => (StatusCode::OK, Json(SoulResponse::success(soul.id.as_str()))),
        Err(e) => (status_for(&e), Json(SoulResponse::error(e.to_string()))),
    }
}

// =============================================================================
// PRESET HANDLERS
// =============================================================================

/// Save the current tree into a slot.
pub async fn save_preset_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PresetSaveRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    match planner.save_preset(request.slot, request.label) {
        Ok(preset) => (StatusCode::OK, Json(PresetResponse::success(preset))),
        Err(e) => (status_for(&e), Json(PresetResponse::error(e.to_string()))),
    }
}

/// Restore the tree from a slot.
pub async fn load_preset_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PresetLoadRequest>,
) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    let result = planner.load_preset(request.slot).map(|_| ());
    state_result(&planner, result)
}

// =============================================================================
// BACKUP HANDLERS
// =============================================================================

/// Full backup document as JSON.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    match planner.export_bytes() {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(StateResponse::error(e.to_string()))).into_response(),
    }
}

/// Apply a backup document. Nothing changes if it fails to parse.
pub async fn import_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let mut planner = state.planner.write().await;
    let result = planner.import_bytes(&body);
    if result.is_ok() {
        tracing::info!(bytes = body.len(), "backup imported over HTTP");
    }
    state_result(&planner, result)
}

/// FNV checksum and BLAKE3 digest of the current backup.
pub async fn hash_handler(State(state): State<AppState>) -> impl IntoResponse {
    let planner = state.planner.read().await;
    let document = planner.export_document();
    match export_document(&document) {
        Ok(bytes) => (
            StatusCode::OK,
            Json(HashResponse {
                checksum: backup_checksum(&document),
                blake3: compute_blake3_hash(&bytes),
            }),
        )
            .into_response(),
        Err(e) => (status_for(&e), Json(StateResponse::error(e.to_string()))).into_response(),
    }
}
