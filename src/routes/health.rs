//! Health check endpoints for liveness and readiness probes.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

/// Readiness probe detail.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub store: BackendStatus,
    pub cache: BackendStatus,
}

#[derive(Debug, Serialize)]
pub struct BackendStatus {
    pub backend: &'static str,
    pub status: String,
}

/// Liveness probe: always returns OK if the process is running.
pub async fn live() -> &'static str {
    "OK"
}

/// Readiness probe: checks store and cache connectivity.
pub async fn ready(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let store_status = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            format!("error: {e}")
        }
    };

    let cache_status = match state.cache.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Cache health check failed");
            format!("error: {e}")
        }
    };

    let status = if store_status == "connected" { "ok" } else { "degraded" };

    ApiResponse::success(HealthStatus {
        status: status.to_string(),
        store: BackendStatus {
            backend: state.store.backend_name(),
            status: store_status,
        },
        cache: BackendStatus {
            backend: state.cache.backend_name(),
            status: cache_status,
        },
    })
}
