//! Dashboard routes: cached statistics, analytics, activity feed and charts.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::keys;
use crate::errors::{ApiResponse, AppError};
use crate::services::charts::ChartData;
use crate::services::dashboard::{self, Activity, AllCharts, Analytics, ChartKind, DashboardStats};
use crate::AppState;

/// Entries shown in the activity feed.
const ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCache {
    pub removed: usize,
}

/// GET /api/dashboard/stats: platform-wide counts.
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    let cached = state
        .cache
        .load(keys::STATS, query.refresh, || dashboard::get_stats(&state.store))
        .await?;
    Ok(ApiResponse::cached(cached.value, cached.meta))
}

/// GET /api/dashboard/analytics: overview plus derived rates and top courses.
pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<Analytics>>, AppError> {
    let cached = state
        .cache
        .load(keys::ANALYTICS, query.refresh, || {
            dashboard::get_analytics(&state.store, Utc::now())
        })
        .await?;
    Ok(ApiResponse::cached(cached.value, cached.meta))
}

/// GET /api/dashboard/activities: most recent enrollments.
pub async fn activities(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<Vec<Activity>>>, AppError> {
    let cached = state
        .cache
        .load(keys::ACTIVITIES, query.refresh, || {
            dashboard::recent_activity(&state.store, ACTIVITY_LIMIT)
        })
        .await?;
    Ok(ApiResponse::cached(cached.value, cached.meta))
}

/// GET /api/dashboard/charts/{chart}: one chart by name.
pub async fn chart(
    State(state): State<AppState>,
    Path(chart): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<ApiResponse<ChartData>>, AppError> {
    let kind: ChartKind = chart.parse()?;
    let now = Utc::now();
    let cached = state
        .cache
        .load_at(kind.cache_key(), query.refresh, now, || {
            kind.fetch(&state.store, now)
        })
        .await?;
    Ok(ApiResponse::cached(cached.value, cached.meta))
}

/// GET /api/dashboard/charts/all: every chart; failures are reported per chart.
pub async fn all_charts(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Json<ApiResponse<AllCharts>> {
    let charts = dashboard::all_charts(&state.store, &state.cache, query.refresh, Utc::now()).await;
    ApiResponse::success(charts)
}

/// POST /api/dashboard/cache/clear: drop all cached dashboard payloads.
pub async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ClearedCache>>, AppError> {
    let removed = state.cache.clear().await?;
    tracing::info!(removed, "Dashboard cache cleared");
    Ok(ApiResponse::with_message(
        ClearedCache { removed },
        "Dashboard cache cleared",
    ))
}
