//! User routes: CRUD, search, paging and enroll-by-course-name.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::{ApiResponse, AppError};
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::user::{CreateUser, EnrollUser, EnrollmentReceipt, UpdateUser, User};
use crate::services::user as user_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/users: paged user list.
pub async fn list(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<PagedResult<User>>>, AppError> {
    let result = user_service::list_paged(&state.store, &pagination).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/users: register a user.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = user_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(user))
}

/// GET /api/users/search?q=: match by id, userId or username.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let users = user_service::search(&state.store, &query.q).await?;
    Ok(ApiResponse::success(users))
}

/// GET /api/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = user_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUser>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = user_service::update(&state.store, &id, &body).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    user_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "User deleted"))
}

/// POST /api/users/enroll: enroll a user (by email) in a course (by name).
pub async fn enroll(
    State(state): State<AppState>,
    Json(body): Json<EnrollUser>,
) -> Result<Json<ApiResponse<EnrollmentReceipt>>, AppError> {
    let receipt = user_service::enroll_in_course(&state.store, &body).await?;
    Ok(ApiResponse::success(receipt))
}
