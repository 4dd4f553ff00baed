pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

/// Shared application state passed to all Axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: store::Store,
    pub cache: cache::DashboardCache,
    pub config: config::AppConfig,
}
