//! Route definitions for the CourseDesk API.

pub mod assessments;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod health;
pub mod modules;
pub mod quizzes;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if frontend_url == "*" {
        return cors.allow_origin(Any);
    }
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url, error = %e, "Invalid FRONTEND_URL, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let dashboard_routes = Router::new()
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/analytics", get(dashboard::analytics))
        .route("/dashboard/activities", get(dashboard::activities))
        .route("/dashboard/charts/all", get(dashboard::all_charts))
        .route("/dashboard/charts/{chart}", get(dashboard::chart))
        .route("/dashboard/cache/clear", post(dashboard::clear_cache));

    let user_routes = Router::new()
        .route("/users", get(users::list).post(users::create))
        .route("/users/search", get(users::search))
        .route("/users/enroll", post(users::enroll))
        .route(
            "/users/{id}",
            get(users::get_by_id).put(users::update).delete(users::delete),
        );

    let course_routes = Router::new()
        .route("/courses", get(courses::list).post(courses::create))
        .route(
            "/courses/{id}",
            get(courses::get_by_id)
                .put(courses::update)
                .delete(courses::delete),
        )
        .route("/courses/{id}/modules", get(courses::modules))
        .route(
            "/courses/{id}/enrolled-users",
            get(courses::enrolled_users)
                .post(courses::add_enrolled_user)
                .delete(courses::remove_enrolled_user),
        )
        .route(
            "/courses/{id}/quizzes",
            get(courses::quizzes).post(courses::create_quiz),
        )
        .route("/courses/{id}/quizzes/stats", get(courses::quiz_stats));

    let content_routes = Router::new()
        .route("/modules", post(modules::create))
        .route(
            "/modules/{id}",
            get(modules::get_by_id)
                .put(modules::update)
                .delete(modules::delete),
        )
        .route("/modules/{id}/lessons", get(modules::lessons))
        .route("/lessons", post(modules::create_lesson))
        .route(
            "/lessons/{id}",
            get(modules::get_lesson)
                .put(modules::update_lesson)
                .delete(modules::delete_lesson),
        )
        .route(
            "/quizzes/{id}",
            get(quizzes::get_by_id)
                .put(quizzes::update)
                .delete(quizzes::delete),
        );

    let enrollment_routes = Router::new()
        .route(
            "/enrollments",
            get(enrollments::list).post(enrollments::create),
        )
        .route(
            "/enrollments/{id}",
            get(enrollments::get_by_id)
                .put(enrollments::update)
                .delete(enrollments::delete),
        )
        .route("/enrollments/{id}/progress", put(enrollments::update_progress));

    let assessment_routes = Router::new()
        .route(
            "/assessments",
            get(assessments::list).post(assessments::create),
        )
        .route(
            "/assessments/{id}",
            get(assessments::get_by_id)
                .put(assessments::update)
                .delete(assessments::delete),
        );

    let api_routes = dashboard_routes
        .merge(user_routes)
        .merge(course_routes)
        .merge(content_routes)
        .merge(enrollment_routes)
        .merge(assessment_routes);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.frontend_url))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware)
        .with_state(state)
}
