//! # Fusion HTTP API Module
//!
//! This module implements the HTTP REST API server using axum, so a
//! renderer (web page, game overlay) can drive the planner.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /state` - Tree state and budget usage
//! - `GET /stats` - Aggregated stat totals
//! - `GET /catalog` - Node catalog
//! - `GET /souls`, `POST /souls`, `POST /souls/delete` - Soul roster
//! - `GET /presets`, `POST /presets/save`, `POST /presets/load` - Presets
//! - `POST /level`, `/equip`, `/unequip`, `/soul-level`, `/budget`, `/reset`
//! - `GET /export`, `POST /import` - Backup document
//! - `GET /hash` - Backup checksums
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `FUSION_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `FUSION_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use types::{
    ApiJson, BudgetRequest, CatalogResponse, EquipRequest, HashResponse, HealthResponse,
    LevelRequest, NodeJson, NodeRequest, PresetLoadRequest, PresetResponse, PresetSaveRequest,
    SoulDeleteRequest, SoulLevelRequest, SoulResponse, StateResponse, StatsResponse, status_for,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use fusion_core::{FusionError, Planner, primitives::MAX_IMPORT_DOCUMENT_SIZE};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the planner.
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<RwLock<Planner>>,
}

impl AppState {
    #[must_use]
    pub fn new(planner: Planner) -> Self {
        Self {
            planner: Arc::new(RwLock::new(planner)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `FUSION_CORS_ORIGINS`.
///
/// - "*": allow all origins
/// - unset: localhost only
/// - otherwise: comma-separated list of origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("FUSION_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (FUSION_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in FUSION_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No FUSION_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for local renderers.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// authentication (if configured).
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set FUSION_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/state", get(handlers::state_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/catalog", get(handlers::catalog_handler))
        .route(
            "/souls",
            get(handlers::souls_handler).post(handlers::save_soul_handler),
        )
        .route("/souls/delete", post(handlers::delete_soul_handler))
        .route("/presets", get(handlers::presets_handler))
        .route("/presets/save", post(handlers::save_preset_handler))
        .route("/presets/load", post(handlers::load_preset_handler))
        .route("/level", post(handlers::level_handler))
        .route("/equip", post(handlers::equip_handler))
        .route("/unequip", post(handlers::unequip_handler))
        .route("/soul-level", post(handlers::soul_level_handler))
        .route("/budget", post(handlers::budget_handler))
        .route("/reset", post(handlers::reset_handler))
        .route("/export", get(handlers::export_handler))
        .route("/import", post(handlers::import_handler))
        .route("/hash", get(handlers::hash_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_IMPORT_DOCUMENT_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, planner: Planner) -> Result<(), FusionError> {
    let state = AppState::new(planner);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| FusionError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Fusion planner HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FusionError::IoError(format!("Server error: {}", e)))
}

/// Resolve on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
