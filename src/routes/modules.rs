//! Module and lesson routes.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::{ApiResponse, AppError};
use crate::models::lesson::{CreateLesson, Lesson, UpdateLesson};
use crate::models::module::{CreateModule, Module, UpdateModule};
use crate::services::{lesson as lesson_service, module as module_service};
use crate::AppState;

/// POST /api/modules: add a module to an existing course.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateModule>,
) -> Result<Json<ApiResponse<Module>>, AppError> {
    let module = module_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(module))
}

/// GET /api/modules/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Module>>, AppError> {
    let module = module_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(module))
}

/// PUT /api/modules/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateModule>,
) -> Result<Json<ApiResponse<Module>>, AppError> {
    let module = module_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(module))
}

/// DELETE /api/modules/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    module_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Module deleted"))
}

/// GET /api/modules/{id}/lessons: lessons in display order.
pub async fn lessons(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Lesson>>>, AppError> {
    let lessons = lesson_service::list_by_module(&state.store, &id).await?;
    Ok(ApiResponse::success(lessons))
}

/// POST /api/lessons
pub async fn create_lesson(
    State(state): State<AppState>,
    Json(body): Json<CreateLesson>,
) -> Result<Json<ApiResponse<Lesson>>, AppError> {
    let lesson = lesson_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(lesson))
}

/// GET /api/lessons/{id}
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Lesson>>, AppError> {
    let lesson = lesson_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(lesson))
}

/// PUT /api/lessons/{id}
pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateLesson>,
) -> Result<Json<ApiResponse<Lesson>>, AppError> {
    let lesson = lesson_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(lesson))
}

/// DELETE /api/lessons/{id}
pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    lesson_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Lesson deleted"))
}
