//! Router configuration.
//!
//! This module creates the main Axum router that combines all endpoints.

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use kc_saml_sp::endpoints::sp_router;

use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    // SAML login, mounted under the context path
    let saml = sp_router().with_state(state.sp_state());
    let context_path = state.config.context_path.trim_matches('/');
    let saml = if context_path.is_empty() {
        saml
    } else {
        Router::new().nest(&format!("/{context_path}"), saml)
    };

    // Create health check routes
    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .with_state(state);

    Router::new()
        .merge(saml)
        .merge(health)
        .route("/", get(root))
        .layer(TraceLayer::new_for_http())
}

/// Root endpoint handler.
async fn root() -> Json<ServerInfo> {
    Json(ServerInfo {
        name: "Keycloak Rust SAML SP".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Server information response.
#[derive(Serialize)]
pub struct ServerInfo {
    name: String,
    version: String,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Kubernetes liveness check.
async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Kubernetes readiness check; ready once a hosted SP is configured.
async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.metadata.hosted_sp_name().is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
