//! In-process document store used by tests and `STORE_BACKEND=memory`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{merge, Document, Filter, StoreError, Tally, WriteOp};

type Collections = HashMap<String, Vec<Document>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn insert(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        guard: Option<&Filter>,
    ) -> Result<Document, StoreError> {
        let mut collections = self.inner.write().await;
        insert_locked(&mut collections, collection, id, data, guard)
    }

    pub(super) async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.inner.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    pub(super) async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.inner.read().await;
        let limit = limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.data))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub(super) async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: &Value,
        expected_version: Option<i64>,
    ) -> Result<Document, StoreError> {
        let mut collections = self.inner.write().await;
        update_locked(&mut collections, collection, id, patch, expected_version)
    }

    pub(super) async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.inner.write().await;
        Ok(delete_locked(&mut collections, collection, id))
    }

    pub(super) async fn count(&self, collection: &str, filter: &Filter) -> Result<i64, StoreError> {
        let collections = self.inner.read().await;
        Ok(collections
            .get(collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(&d.data)).count()) as i64)
    }

    pub(super) async fn tally(&self, collection: &str, field: &str) -> Result<Vec<Tally>, StoreError> {
        let collections = self.inner.read().await;
        let mut tallies: Vec<Tally> = Vec::new();
        for doc in collections.get(collection).into_iter().flatten() {
            let value = doc.data.get(field).cloned().unwrap_or(Value::Null);
            match tallies.iter_mut().find(|t| t.value == value) {
                Some(t) => t.count += 1,
                None => tallies.push(Tally { value, count: 1 }),
            }
        }
        Ok(tallies)
    }

    /// Applies every op against a scratch copy and swaps it in only on success.
    pub(super) async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut collections = self.inner.write().await;
        let mut scratch = collections.clone();
        for op in ops {
            match op {
                WriteOp::Insert {
                    collection,
                    id,
                    data,
                    guard,
                } => {
                    insert_locked(&mut scratch, collection, &id, data, guard.as_ref())?;
                }
                WriteOp::Update {
                    collection,
                    id,
                    patch,
                    expected_version,
                } => {
                    update_locked(&mut scratch, collection, &id, &patch, expected_version)?;
                }
                WriteOp::Delete { collection, id } => {
                    if !delete_locked(&mut scratch, collection, &id) {
                        return Err(StoreError::not_found(collection, &id));
                    }
                }
            }
        }
        *collections = scratch;
        Ok(())
    }
}

fn insert_locked(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    data: Value,
    guard: Option<&Filter>,
) -> Result<Document, StoreError> {
    let docs = collections.entry(collection.to_string()).or_default();
    if docs.iter().any(|d| d.id == id) {
        return Err(StoreError::duplicate(collection));
    }
    if let Some(guard) = guard {
        if docs.iter().any(|d| guard.matches(&d.data)) {
            return Err(StoreError::duplicate(collection));
        }
    }
    let doc = Document {
        id: id.to_string(),
        version: 1,
        data,
    };
    docs.push(doc.clone());
    Ok(doc)
}

fn update_locked(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    patch: &Value,
    expected_version: Option<i64>,
) -> Result<Document, StoreError> {
    let doc = collections
        .get_mut(collection)
        .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        .ok_or_else(|| StoreError::not_found(collection, id))?;
    if expected_version.is_some_and(|v| v != doc.version) {
        return Err(StoreError::conflict(collection, id));
    }
    merge(&mut doc.data, patch);
    doc.version += 1;
    Ok(doc.clone())
}

fn delete_locked(collections: &mut Collections, collection: &str, id: &str) -> bool {
    let Some(docs) = collections.get_mut(collection) else {
        return false;
    };
    let before = docs.len();
    docs.retain(|d| d.id != id);
    docs.len() != before
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::store::{Filter, Store, StoreError, WriteOp};

    #[tokio::test]
    async fn find_preserves_insertion_order_and_limit() {
        let store = Store::memory();
        for (id, order) in [("a", 2), ("b", 1), ("c", 2)] {
            store
                .insert("modules", id.to_string(), json!({"order": order, "courseId": "c1"}))
                .await
                .unwrap();
        }
        let docs = store.find("modules", &Filter::new(), None).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let docs = store
            .find("modules", &Filter::new().eq("order", 2), Some(1))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn update_merges_and_bumps_version() {
        let store = Store::memory();
        store
            .insert("courses", "c1".to_string(), json!({"title": "Rust", "rating": 4}))
            .await
            .unwrap();
        let doc = store
            .update("courses", "c1", json!({"rating": 5}), Some(1))
            .await
            .unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.data["title"], "Rust");
        assert_eq!(doc.data["rating"], 5);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = Store::memory();
        store
            .insert("courses", "c1".to_string(), json!({}))
            .await
            .unwrap();
        store.update("courses", "c1", json!({"a": 1}), None).await.unwrap();
        let err = store
            .update("courses", "c1", json!({"a": 2}), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = Store::memory();
        let err = store
            .update("courses", "nope", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn insert_unique_honours_guard() {
        let store = Store::memory();
        let guard = Filter::new().eq("userId", "u1").eq("courseId", "c1");
        store
            .insert_unique("enrollments", "e1".to_string(), json!({"userId": "u1", "courseId": "c1"}), &guard)
            .await
            .unwrap();
        let err = store
            .insert_unique("enrollments", "e2".to_string(), json!({"userId": "u1", "courseId": "c1"}), &guard)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.count("enrollments", &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let store = Store::memory();
        store
            .insert("users", "u1".to_string(), json!({"coursesTaken": []}))
            .await
            .unwrap();
        let result = store
            .commit(vec![
                WriteOp::update("users", "u1", json!({"coursesTaken": ["Rust"]}), Some(1)),
                WriteOp::update("courses", "missing", json!({"enrolledUsers": []}), None),
            ])
            .await;
        assert!(result.is_err());
        let user = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(user.data["coursesTaken"], json!([]));
        assert_eq!(user.version, 1);
    }

    #[tokio::test]
    async fn tally_groups_missing_field_as_null() {
        let store = Store::memory();
        for (id, status) in [("1", Some("active")), ("2", None), ("3", Some("active"))] {
            let data = match status {
                Some(s) => json!({"status": s}),
                None => json!({}),
            };
            store.insert("users", id.to_string(), data).await.unwrap();
        }
        let tallies = store.tally("users", "status").await.unwrap();
        let active = tallies.iter().find(|t| t.value == "active").unwrap();
        let unset = tallies.iter().find(|t| t.value.is_null()).unwrap();
        assert_eq!(active.count, 2);
        assert_eq!(unset.count, 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_document_existed() {
        let store = Store::memory();
        store.insert("lessons", "l1".to_string(), json!({})).await.unwrap();
        assert!(store.delete("lessons", "l1").await.unwrap());
        assert!(!store.delete("lessons", "l1").await.unwrap());
    }
}
