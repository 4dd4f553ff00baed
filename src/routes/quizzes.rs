//! Single-quiz routes. Listing and creation live under the owning course.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::models::quiz::{Quiz, UpdateQuiz};
use crate::services::quiz as quiz_service;
use crate::AppState;

/// GET /api/quizzes/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Quiz>>, AppError> {
    let quiz = quiz_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(quiz))
}

/// PUT /api/quizzes/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateQuiz>,
) -> Result<Json<ApiResponse<Quiz>>, AppError> {
    let quiz = quiz_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(quiz))
}

/// DELETE /api/quizzes/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    quiz_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Quiz deleted"))
}
