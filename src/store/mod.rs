//! Document store: named collections of JSON documents with equality queries.
//!
//! Two backends share one surface. [`PgStore`] keeps every document in a
//! single JSONB table and pushes filters and grouped counts into SQL;
//! [`MemoryStore`] keeps everything behind a `RwLock` for tests and local runs.
//!
//! Every document carries a `version` that is bumped on each write, so
//! read-then-write sequences can be expressed as compare-and-swap updates
//! or as an atomic [`Store::commit`] of several [`WriteOp`]s.

pub mod memory;
pub mod postgres;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{AppConfig, StoreBackend};

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const COURSES: &str = "courses";
    pub const MODULES: &str = "modules";
    pub const LESSONS: &str = "lessons";
    pub const QUIZZES: &str = "quizzes";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const ASSESSMENTS: &str = "technical_assessments";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("document {collection}/{id} was modified concurrently")]
    VersionConflict { collection: String, id: String },

    #[error("a matching document already exists in {collection}")]
    Duplicate { collection: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(collection: &str, id: &str) -> Self {
        Self::VersionConflict {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(collection: &str) -> Self {
        Self::Duplicate {
            collection: collection.to_string(),
        }
    }
}

/// Conjunction of field equality predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Require `field == value` when a value is given.
    pub fn eq_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a document body satisfies every predicate.
    pub fn matches(&self, data: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }

    /// JSON object used for JSONB containment (`data @> filter`).
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// A stored document: id and version live beside the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub version: i64,
    pub data: Value,
}

impl Document {
    /// Deserialize into an entity, exposing the document id as `id`.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut data = match self.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// One step of an atomic multi-document write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert {
        collection: &'static str,
        id: String,
        data: Value,
        guard: Option<Filter>,
    },
    Update {
        collection: &'static str,
        id: String,
        patch: Value,
        expected_version: Option<i64>,
    },
    Delete {
        collection: &'static str,
        id: String,
    },
}

impl WriteOp {
    pub fn insert(collection: &'static str, id: impl Into<String>, data: Value) -> Self {
        Self::Insert {
            collection,
            id: id.into(),
            data: stamp_created(data),
            guard: None,
        }
    }

    /// Insert that fails with [`StoreError::Duplicate`] if `guard` matches a document.
    pub fn insert_unique(
        collection: &'static str,
        id: impl Into<String>,
        data: Value,
        guard: Filter,
    ) -> Self {
        Self::Insert {
            collection,
            id: id.into(),
            data: stamp_created(data),
            guard: Some(guard),
        }
    }

    pub fn update(
        collection: &'static str,
        id: impl Into<String>,
        patch: Value,
        expected_version: Option<i64>,
    ) -> Self {
        Self::Update {
            collection,
            id: id.into(),
            patch: stamp_updated(patch),
            expected_version,
        }
    }

    pub fn delete(collection: &'static str, id: impl Into<String>) -> Self {
        Self::Delete {
            collection,
            id: id.into(),
        }
    }
}

/// Grouped count for one distinct value of a field (`Value::Null` when absent).
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub value: Value,
    pub count: i64,
}

/// Sum the counts whose value satisfies `pred`.
pub fn tally_sum(tallies: &[Tally], pred: impl Fn(&Value) -> bool) -> i64 {
    tallies
        .iter()
        .filter(|t| pred(&t.value))
        .map(|t| t.count)
        .sum()
}

/// Current instant in the ISO-8601 form documents store.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generate a new document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn stamp_created(data: Value) -> Value {
    let mut map = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.remove("id");
    let now = now_iso();
    map.entry("createdAt").or_insert_with(|| Value::String(now.clone()));
    map.insert("updatedAt".to_string(), Value::String(now));
    Value::Object(map)
}

fn stamp_updated(patch: Value) -> Value {
    let mut map = match patch {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.remove("id");
    map.insert("updatedAt".to_string(), Value::String(now_iso()));
    Value::Object(map)
}

/// Shallow merge of `patch` into `target` (top-level keys replace).
pub(crate) fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Backend-independent handle to the document store.
#[derive(Debug, Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    /// Build the backend selected by configuration, running migrations for Postgres.
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        match config.store_backend {
            StoreBackend::Memory => Ok(Self::Memory(MemoryStore::new())),
            StoreBackend::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                let pool = crate::db::create_pool(url, config.database_max_connections).await?;
                crate::db::migrate(&pool).await?;
                Ok(Self::Postgres(PgStore::new(pool)))
            }
        }
    }

    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Round-trip to the backend.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(s) => s.ping().await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Insert a new document, stamping `createdAt`/`updatedAt`.
    pub async fn insert(
        &self,
        collection: &'static str,
        id: String,
        data: Value,
    ) -> Result<Document, StoreError> {
        let data = stamp_created(data);
        match self {
            Self::Postgres(s) => s.insert(collection, &id, &data, None).await,
            Self::Memory(s) => s.insert(collection, &id, data, None).await,
        }
    }

    /// Insert unless a document matching `guard` already exists.
    pub async fn insert_unique(
        &self,
        collection: &'static str,
        id: String,
        data: Value,
        guard: &Filter,
    ) -> Result<Document, StoreError> {
        let data = stamp_created(data);
        match self {
            Self::Postgres(s) => s.insert(collection, &id, &data, Some(guard)).await,
            Self::Memory(s) => s.insert(collection, &id, data, Some(guard)).await,
        }
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self {
            Self::Postgres(s) => s.get(collection, id).await,
            Self::Memory(s) => s.get(collection, id).await,
        }
    }

    /// Documents matching `filter`, in insertion order.
    pub async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        match self {
            Self::Postgres(s) => s.find(collection, filter, limit).await,
            Self::Memory(s) => s.find(collection, filter, limit).await,
        }
    }

    pub async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.find(collection, filter, Some(1)).await?.into_iter().next())
    }

    /// Merge `patch` into a document. With `expected_version` the write only
    /// lands if nobody else wrote in between.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
        expected_version: Option<i64>,
    ) -> Result<Document, StoreError> {
        let patch = stamp_updated(patch);
        match self {
            Self::Postgres(s) => s.update(collection, id, &patch, expected_version).await,
            Self::Memory(s) => s.update(collection, id, &patch, expected_version).await,
        }
    }

    /// Remove a document. Returns `false` if it did not exist.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(s) => s.delete(collection, id).await,
            Self::Memory(s) => s.delete(collection, id).await,
        }
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        match self {
            Self::Postgres(s) => s.count(collection, filter).await,
            Self::Memory(s) => s.count(collection, filter).await,
        }
    }

    /// Count documents grouped by the value of one top-level field.
    pub async fn tally(&self, collection: &str, field: &str) -> Result<Vec<Tally>, StoreError> {
        match self {
            Self::Postgres(s) => s.tally(collection, field).await,
            Self::Memory(s) => s.tally(collection, field).await,
        }
    }

    /// Apply all operations atomically; nothing is written if any step fails.
    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        match self {
            Self::Postgres(s) => s.commit(&ops).await,
            Self::Memory(s) => s.commit(ops).await,
        }
    }

    /// Fetch all matching documents and deserialize them.
    pub async fn find_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<T>, StoreError> {
        self.find(collection, filter, None)
            .await?
            .into_iter()
            .map(Document::into_entity)
            .collect()
    }

    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        self.get(collection, id)
            .await?
            .map(Document::into_entity)
            .transpose()
    }
}
