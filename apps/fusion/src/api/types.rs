//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Planner data (`TreeState`, `Soul`, `Preset`) keeps the backup file's
//! field names so a renderer can use one shape for both.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use fusion_core::{
    BudgetSummary, FusionError, NodeDef, NodeId, Preset, Rarity, SoulLevel, StatTotal, Tag,
    TreeState, cost_per_level,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// HTTP status for a rejected planner operation.
#[must_use]
pub fn status_for(error: &FusionError) -> StatusCode {
    match error {
        FusionError::UnknownNode(_) | FusionError::UnknownSoul(_) | FusionError::EmptySlot(_) => {
            StatusCode::NOT_FOUND
        }
        FusionError::SoulAlreadyEquipped { .. } => StatusCode::CONFLICT,
        FusionError::IoError(_) | FusionError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

/// JSON body extractor whose rejections use the `StateResponse` error shape.
///
/// Syntax errors, wrong field types and a missing JSON content type map to
/// 400; an oversized body keeps 413.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<StateResponse>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let status = match rejection.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                tracing::debug!(%status, "rejected request body: {}", rejection.body_text());
                Err((status, Json(StateResponse::error(rejection.body_text()))))
            }
        }
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Set a node's level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRequest {
    pub node: u32,
    pub level: i64,
}

/// Equip a soul on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipRequest {
    pub node: u32,
    pub soul: String,
}

/// Target a single node (unequip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    pub node: u32,
}

/// Set the level of the soul on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulLevelRequest {
    pub node: u32,
    /// Wide on the wire so out-of-range values reach `soul_level`.
    pub level: i64,
}

impl SoulLevelRequest {
    /// Validate the soul level range.
    pub fn soul_level(&self) -> Result<SoulLevel, FusionError> {
        u8::try_from(self.level)
            .ok()
            .and_then(|level| SoulLevel::try_from(level).ok())
            .ok_or(FusionError::InvalidLevel {
                node: Some(NodeId(self.node)),
                level: self.level,
            })
    }
}

/// Replace the point budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRequest {
    #[serde(alias = "userFusionLevel")]
    pub value: i64,
}

/// Delete a soul.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulDeleteRequest {
    pub id: String,
}

/// Save the current tree into a preset slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetSaveRequest {
    pub slot: usize,
    #[serde(default, alias = "name")]
    pub label: Option<String>,
}

/// Restore the tree from a preset slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetLoadRequest {
    pub slot: usize,
}

// =============================================================================
// STATE RESPONSE
// =============================================================================

/// Tree state plus budget usage; returned by every tree mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub success: bool,
    pub state: Option<TreeState>,
    pub budget: Option<BudgetSummary>,
    pub error: Option<String>,
}

impl StateResponse {
    pub fn success(state: &TreeState, budget: BudgetSummary) -> Self {
        Self {
            success: true,
            state: Some(state.clone()),
            budget: Some(budget),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            state: None,
            budget: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STATS RESPONSE
// =============================================================================

/// Aggregated stat totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub totals: Vec<StatTotal>,
    pub budget: BudgetSummary,
}

// =============================================================================
// CATALOG RESPONSE
// =============================================================================

/// A catalog node as seen by a renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJson {
    pub id: u32,
    pub rarity: Rarity,
    pub tag: Tag,
    pub parents: Vec<u32>,
    pub cost: u32,
}

impl From<&NodeDef> for NodeJson {
    fn from(def: &NodeDef) -> Self {
        Self {
            id: def.id.0,
            rarity: def.rarity,
            tag: def.tag,
            parents: def.parents.iter().map(|p| p.0).collect(),
            cost: cost_per_level(def.rarity),
        }
    }
}

/// The node catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub nodes: Vec<NodeJson>,
}

// =============================================================================
// SOUL RESPONSE
// =============================================================================

/// Result of a soul save or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulResponse {
    pub success: bool,
    pub id: Option<String>,
    pub error: Option<String>,
}

impl SoulResponse {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// PRESET RESPONSE
// =============================================================================

/// Result of a preset save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetResponse {
    pub success: bool,
    pub preset: Option<Preset>,
    pub error: Option<String>,
}

impl PresetResponse {
    pub fn success(preset: &Preset) -> Self {
        Self {
            success: true,
            preset: Some(preset.clone()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            preset: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// HASH RESPONSE
// =============================================================================

/// Checksums of the current backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashResponse {
    pub checksum: u64,
    pub blake3: String,
}
