//! Read-through TTL cache for dashboard payloads.
//!
//! Entries are stored without expiry so an outdated payload is still
//! available as a fallback when the store cannot be reached. Freshness is
//! decided on read: an entry is served as-is while `now - cached_at <= ttl`.
//! Concurrent refreshes are not coordinated; the last write wins.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::errors::AppError;

/// Fixed cache keys, relative to the configured namespace.
pub mod keys {
    pub const STATS: &str = "dashboard:stats";
    pub const ANALYTICS: &str = "dashboard:analytics";
    pub const ACTIVITIES: &str = "dashboard:activities";
    pub const USERS_CREATED: &str = "dashboard:charts:users-created";
    pub const LEADERBOARD: &str = "dashboard:charts:leaderboard";
    pub const QUIZ_ANALYTICS: &str = "dashboard:charts:quiz-analytics";
    pub const COURSE_PROGRESS: &str = "dashboard:charts:course-progress";
    pub const ACHIEVEMENTS: &str = "dashboard:charts:achievements";

    pub const ALL: &[&str] = &[
        STATS,
        ANALYTICS,
        ACTIVITIES,
        USERS_CREATED,
        LEADERBOARD,
        QUIZ_ANALYTICS,
        COURSE_PROGRESS,
        ACHIEVEMENTS,
    ];
}

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Fetched from the store on this request.
    Fresh,
    /// Served from a cache entry still within its TTL.
    Cache,
    /// The fetch failed and an entry past its TTL was served instead.
    StaleFallback,
}

/// Provenance reported alongside cached payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub source: CacheSource,
    pub cached_at: DateTime<Utc>,
    pub using_cache: bool,
}

/// A payload together with its provenance.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub meta: CacheMeta,
}

impl<T> Cached<T> {
    fn new(value: T, source: CacheSource, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            meta: CacheMeta {
                source,
                cached_at,
                using_cache: source != CacheSource::Fresh,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    payload: serde_json::Value,
    cached_at: DateTime<Utc>,
}

#[derive(Clone)]
enum CacheBackend {
    Redis(MultiplexedConnection),
    Memory(Arc<RwLock<HashMap<String, String>>>),
}

impl fmt::Debug for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redis(_) => f.write_str("Redis"),
            Self::Memory(_) => f.write_str("Memory"),
        }
    }
}

/// Namespaced key/value cache for dashboard results.
#[derive(Debug, Clone)]
pub struct DashboardCache {
    backend: CacheBackend,
    namespace: String,
    ttl: Duration,
}

impl DashboardCache {
    /// Connect to Redis when `REDIS_URL` is configured, else keep entries in process.
    pub async fn connect(config: &AppConfig) -> Result<Self, redis::RedisError> {
        let backend = match config.redis_url.as_deref() {
            Some(url) => {
                let client = redis::Client::open(url)?;
                CacheBackend::Redis(client.get_multiplexed_async_connection().await?)
            }
            None => CacheBackend::Memory(Arc::default()),
        };
        Ok(Self {
            backend,
            namespace: config.cache_namespace.clone(),
            ttl: Duration::seconds(config.cache_ttl_secs),
        })
    }

    /// In-process cache with the given TTL.
    pub fn memory(namespace: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            backend: CacheBackend::Memory(Arc::default()),
            namespace: namespace.into(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            CacheBackend::Redis(_) => "redis",
            CacheBackend::Memory(_) => "memory",
        }
    }

    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        if let CacheBackend::Redis(conn) = &self.backend {
            let mut conn = conn.clone();
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        }
        Ok(())
    }

    /// Serve `key` from cache or run `fetch`, see [`DashboardCache::load_at`].
    pub async fn load<T, F, Fut>(&self, key: &str, force: bool, fetch: F) -> Result<Cached<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.load_at(key, force, Utc::now(), fetch).await
    }

    /// Read-through load evaluated at `now`.
    ///
    /// Without `force`, an entry younger than the TTL is returned without
    /// calling `fetch`. Otherwise `fetch` runs and a success overwrites the
    /// entry. A failed fetch falls back to any existing entry regardless of
    /// age and only surfaces the error when there is none.
    pub async fn load_at<T, F, Fut>(
        &self,
        key: &str,
        force: bool,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<Cached<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut existing = None;
        if !force {
            existing = self.read(key).await;
            if let Some(entry) = &existing {
                if now - entry.cached_at <= self.ttl {
                    if let Ok(value) = serde_json::from_value(entry.payload.clone()) {
                        tracing::debug!(key, "Dashboard cache hit");
                        return Ok(Cached::new(value, CacheSource::Cache, entry.cached_at));
                    }
                }
            }
        }

        match fetch().await {
            Ok(value) => {
                self.write(key, &value, now).await;
                Ok(Cached::new(value, CacheSource::Fresh, now))
            }
            Err(err) => {
                let entry = match existing {
                    Some(entry) => Some(entry),
                    None => self.read(key).await,
                };
                let fallback = entry.and_then(|entry| {
                    serde_json::from_value(entry.payload)
                        .ok()
                        .map(|value| Cached::new(value, CacheSource::StaleFallback, entry.cached_at))
                });
                match fallback {
                    Some(cached) => {
                        tracing::warn!(key, error = %err, "Fetch failed, serving cached payload");
                        Ok(cached)
                    }
                    None => Err(err),
                }
            }
        }
    }

    /// Drop every dashboard entry in this namespace. Returns how many existed.
    pub async fn clear(&self) -> Result<usize, AppError> {
        let names: Vec<String> = keys::ALL.iter().map(|key| self.full_key(key)).collect();
        match &self.backend {
            CacheBackend::Redis(conn) => {
                let mut conn = conn.clone();
                let removed: usize = conn.del(names).await?;
                Ok(removed)
            }
            CacheBackend::Memory(map) => {
                let mut map = map.write().await;
                Ok(names.iter().filter(|name| map.remove(*name).is_some()).count())
            }
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    async fn read(&self, key: &str) -> Option<CacheEntry> {
        let name = self.full_key(key);
        let raw = match &self.backend {
            CacheBackend::Redis(conn) => {
                let mut conn = conn.clone();
                match conn.get::<_, Option<String>>(&name).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!(key = %name, error = %e, "Cache read failed");
                        None
                    }
                }
            }
            CacheBackend::Memory(map) => map.read().await.get(&name).cloned(),
        }?;

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %name, error = %e, "Discarding malformed cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, now: DateTime<Utc>) {
        let name = self.full_key(key);
        let entry = match serde_json::to_value(value) {
            Ok(payload) => CacheEntry {
                payload,
                cached_at: now,
            },
            Err(e) => {
                tracing::warn!(key = %name, error = %e, "Payload not cacheable");
                return;
            }
        };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %name, error = %e, "Payload not cacheable");
                return;
            }
        };

        match &self.backend {
            CacheBackend::Redis(conn) => {
                let mut conn = conn.clone();
                if let Err(e) = conn.set::<_, _, ()>(&name, raw).await {
                    tracing::warn!(key = %name, error = %e, "Cache write failed");
                }
            }
            CacheBackend::Memory(map) => {
                map.write().await.insert(name, raw);
            }
        }
    }
}
