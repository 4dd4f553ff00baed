use std::net::SocketAddr;

use anyhow::Context;
use coursedesk::cache::DashboardCache;
use coursedesk::config::AppConfig;
use coursedesk::store::Store;
use coursedesk::{routes, AppState};
use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursedesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let store = Store::connect(&config)
        .await
        .context("Failed to initialise document store")?;
    let cache = DashboardCache::connect(&config)
        .await
        .context("Failed to initialise dashboard cache")?;
    tracing::info!(
        store = store.backend_name(),
        cache = cache.backend_name(),
        "Backends ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    tracing::info!(host = %addr, "Starting CourseDesk API server");

    let app = routes::router(AppState {
        store,
        cache,
        config,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
