//! Course routes: CRUD, enrolled-user list, modules and course quizzes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::models::course::{Course, CourseMember, CreateCourse, UpdateCourse};
use crate::models::module::Module;
use crate::models::quiz::{CreateQuiz, Quiz};
use crate::services::course as course_service;
use crate::services::quiz::{self as quiz_service, QuizStats};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuery {
    pub module_id: Option<String>,
}

/// GET /api/courses
pub async fn list(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Course>>>, AppError> {
    let courses = course_service::list(&state.store).await?;
    Ok(ApiResponse::success(courses))
}

/// POST /api/courses: create a course; names must be unique.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCourse>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    let course = course_service::create(&state.store, &body).await?;
    Ok(ApiResponse::success(course))
}

/// GET /api/courses/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    let course = course_service::get(&state.store, &id).await?;
    Ok(ApiResponse::success(course))
}

/// PUT /api/courses/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCourse>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    let course = course_service::update(&state.store, &id, body).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    course_service::delete(&state.store, &id).await?;
    Ok(ApiResponse::with_message((), "Course deleted"))
}

/// GET /api/courses/{id}/modules: modules in display order.
pub async fn modules(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Module>>>, AppError> {
    let modules = course_service::modules(&state.store, &id).await?;
    Ok(ApiResponse::success(modules))
}

/// GET /api/courses/{id}/enrolled-users: emails of enrolled users.
pub async fn enrolled_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let users = course_service::enrolled_users(&state.store, &id).await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/courses/{id}/enrolled-users: add an email to the course.
pub async fn add_enrolled_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CourseMember>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    body.validate()?;
    let course = course_service::add_user(&state.store, &id, &body.email).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/{id}/enrolled-users?email=: remove an email from the course.
pub async fn remove_enrolled_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(member): Query<CourseMember>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    member.validate()?;
    let course = course_service::remove_user(&state.store, &id, &member.email).await?;
    Ok(ApiResponse::success(course))
}

/// GET /api/courses/{id}/quizzes?moduleId=: quizzes of a course, optionally one module.
pub async fn quizzes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<QuizQuery>,
) -> Result<Json<ApiResponse<Vec<Quiz>>>, AppError> {
    let quizzes = quiz_service::list(&state.store, &id, query.module_id.as_deref()).await?;
    Ok(ApiResponse::success(quizzes))
}

/// POST /api/courses/{id}/quizzes
pub async fn create_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateQuiz>,
) -> Result<Json<ApiResponse<Quiz>>, AppError> {
    let quiz = quiz_service::create(&state.store, &id, body).await?;
    Ok(ApiResponse::success(quiz))
}

/// GET /api/courses/{id}/quizzes/stats: quiz counts by difficulty and module.
pub async fn quiz_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QuizStats>>, AppError> {
    let stats = quiz_service::stats(&state.store, &id).await?;
    Ok(ApiResponse::success(stats))
}
