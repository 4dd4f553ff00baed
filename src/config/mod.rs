use std::env;
use std::str::FromStr;

/// Which document store implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                key: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub cache_ttl_secs: i64,
    pub cache_namespace: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

impl AppConfig {
    /// Twelve hours.
    pub const DEFAULT_CACHE_TTL_SECS: i64 = 12 * 60 * 60;

    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            store_backend,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_CACHE_TTL_SECS),
            cache_namespace: env::var("CACHE_NAMESPACE")
                .unwrap_or_else(|_| "coursedesk".to_string()),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BACKEND_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "*".to_string()),
        })
    }

    /// In-memory configuration used by tests and the seed tool's dry runs.
    pub fn in_memory() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            redis_url: None,
            cache_ttl_secs: Self::DEFAULT_CACHE_TTL_SECS,
            cache_namespace: "coursedesk-test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            frontend_url: "*".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_aliases() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("PG".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
    }

    #[test]
    fn store_backend_rejects_unknown() {
        let err = "mongo".parse::<StoreBackend>().unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn in_memory_defaults_to_twelve_hour_ttl() {
        let config = AppConfig::in_memory();
        assert_eq!(config.cache_ttl_secs, 43_200);
        assert!(config.redis_url.is_none());
    }
}
