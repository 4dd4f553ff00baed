//! Technical assessment routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::models::assessment::{
    AssessmentFilters, CreateAssessment, TechnicalAssessment, UpdateAssessment,
};
use crate::services::assessment as assessment_service;
use crate::AppState;

/// GET /api/assessments?type&active
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<AssessmentFilters>,
) -> Result<Json<ApiResponse<Vec<TechnicalAssessment>>>, AppError> {
    let assessments = assessment_service::list(&state.store, &filters).await?;
    Ok(ApiResponse::success(assessments))
}

/// POST /api/assessments
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAssessment>,
) -> Result<Json<ApiResponse<TechnicalAssessment>>, AppError> {
    let assessment = assessment_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(assessment))
}

/// GET /api/assessments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TechnicalAssessment>>, AppError> {
    let assessment = assessment_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(assessment))
}

/// PUT /api/assessments/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAssessment>,
) -> Result<Json<ApiResponse<TechnicalAssessment>>, AppError> {
    let assessment = assessment_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(assessment))
}

/// DELETE /api/assessments/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    assessment_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Assessment deleted"))
}
