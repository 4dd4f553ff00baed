//! Enrollment routes.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::models::enrollment::{
    CreateEnrollment, Enrollment, EnrollmentFilters, ProgressUpdate, UpdateEnrollment,
};
use crate::services::enrollment as enrollment_service;
use crate::AppState;

/// GET /api/enrollments?userId&courseId&status
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<EnrollmentFilters>,
) -> Result<Json<ApiResponse<Vec<Enrollment>>>, AppError> {
    let enrollments = enrollment_service::list(&state.store, &filters).await?;
    Ok(ApiResponse::success(enrollments))
}

/// POST /api/enrollments: enroll a user; one active enrollment per user and course.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateEnrollment>,
) -> Result<Json<ApiResponse<Enrollment>>, AppError> {
    let enrollment = enrollment_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(enrollment))
}

/// GET /api/enrollments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Enrollment>>, AppError> {
    let enrollment = enrollment_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(enrollment))
}

/// PUT /api/enrollments/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateEnrollment>,
) -> Result<Json<ApiResponse<Enrollment>>, AppError> {
    let enrollment = enrollment_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(enrollment))
}

/// PUT /api/enrollments/{id}/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProgressUpdate>,
) -> Result<Json<ApiResponse<Enrollment>>, AppError> {
    let enrollment = enrollment_service::update_progress(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(enrollment))
}

/// DELETE /api/enrollments/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    enrollment_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Enrollment deleted"))
}
