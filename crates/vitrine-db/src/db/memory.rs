//! In-memory document store with injectable faults.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use uuid::Uuid;
use vitrine_core::DocumentBackend;

use super::document::{ensure_object, DbError, DbResult, Document, DocumentStore, StoreOperation};
use super::merge::deep_merge;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    data: JsonValue,
}

impl Entry {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_string(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            data: self.data.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, HashMap<String, Entry>>,
    next_seq: u64,
    failing: HashSet<StoreOperation>,
}

impl Inner {
    fn check(&self, op: StoreOperation) -> DbResult<()> {
        if self.failing.contains(&op) {
            return Err(DbError::Unavailable(format!("{:?} rejected", op)));
        }
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Document store held entirely in process memory.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `op` fail with [`DbError::Unavailable`] until cleared.
    pub async fn fail_operation(&self, op: StoreOperation) {
        self.inner.write().await.failing.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.inner.write().await.failing.clear();
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, data: JsonValue) -> DbResult<Document> {
        ensure_object(&data)?;
        let mut inner = self.inner.write().await;
        inner.check(StoreOperation::Insert)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let entry = Entry {
            seq: inner.next_seq(),
            created_at: now,
            updated_at: now,
            data,
        };
        let document = entry.to_document(&id);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, entry);
        Ok(document)
    }

    async fn upsert(&self, collection: &str, id: &str, data: JsonValue) -> DbResult<Document> {
        ensure_object(&data)?;
        let mut inner = self.inner.write().await;
        inner.check(StoreOperation::Upsert)?;

        let now = Utc::now();
        let seq = inner.next_seq();
        let entry = inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| Entry {
                seq,
                created_at: now,
                updated_at: now,
                data: JsonValue::Object(Default::default()),
            });
        deep_merge(&mut entry.data, data);
        entry.updated_at = now;
        Ok(entry.to_document(id))
    }

    async fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let inner = self.inner.read().await;
        inner.check(StoreOperation::Get)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|entry| entry.to_document(id)))
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<Document>> {
        let inner = self.inner.read().await;
        inner.check(StoreOperation::Query)?;

        let mut matches: Vec<(&String, &Entry)> = inner
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, entry)| {
                        entry.data.get(field).and_then(JsonValue::as_str) == Some(value)
                    })
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.1.seq.cmp(&a.1.seq))
        });

        Ok(matches
            .into_iter()
            .map(|(id, entry)| entry.to_document(id))
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: JsonValue) -> DbResult<Document> {
        ensure_object(&patch)?;
        let mut inner = self.inner.write().await;
        inner.check(StoreOperation::Update)?;

        let entry = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DbError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        deep_merge(&mut entry.data, patch);
        entry.updated_at = Utc::now();
        Ok(entry.to_document(id))
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<()> {
        let mut inner = self.inner.write().await;
        inner.check(StoreOperation::Delete)?;
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    fn backend_type(&self) -> DocumentBackend {
        DocumentBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = MemoryDocumentStore::new();
        let doc = store
            .insert("photoUploads", json!({ "ownerId": "u1" }))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&doc.id).is_ok());
        assert_eq!(doc.created_at, doc.updated_at);

        let fetched = store.get("photoUploads", &doc.id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test]
    async fn test_rejects_non_object_body() {
        let store = MemoryDocumentStore::new();
        let result = store.insert("posts", json!("just a string")).await;
        assert!(matches!(result, Err(DbError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_query_filters_and_orders_newest_first() {
        let store = MemoryDocumentStore::new();
        let first = store
            .insert("photoUploads", json!({ "ownerId": "u1", "n": 1 }))
            .await
            .unwrap();
        store
            .insert("photoUploads", json!({ "ownerId": "u2", "n": 2 }))
            .await
            .unwrap();
        let third = store
            .insert("photoUploads", json!({ "ownerId": "u1", "n": 3 }))
            .await
            .unwrap();

        let docs = store
            .query_by_field("photoUploads", "ownerId", "u1")
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_updated_at() {
        let store = MemoryDocumentStore::new();
        let doc = store
            .insert(
                "photoUploads",
                json!({ "metadata": { "altText": "dog" }, "ownerId": "u1" }),
            )
            .await
            .unwrap();

        let updated = store
            .update("photoUploads", &doc.id, json!({ "metadata": { "caption": "hi" } }))
            .await
            .unwrap();
        assert_eq!(
            updated.data["metadata"],
            json!({ "altText": "dog", "caption": "hi" })
        );
        assert_eq!(updated.created_at, doc.created_at);
        assert!(updated.updated_at >= doc.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let result = store.update("posts", "nope", json!({ "a": 1 })).await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_upsert_preserves_created_at() {
        let store = MemoryDocumentStore::new();
        let created = store
            .upsert("users", "u1", json!({ "email": "a@example.com" }))
            .await
            .unwrap();
        let merged = store
            .upsert("users", "u1", json!({ "address": "Main St" }))
            .await
            .unwrap();

        assert_eq!(merged.created_at, created.created_at);
        assert_eq!(
            merged.data,
            json!({ "email": "a@example.com", "address": "Main St" })
        );
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryDocumentStore::new();
        store.fail_operation(StoreOperation::Query).await;
        assert!(matches!(
            store.query_by_field("posts", "authorUid", "u1").await,
            Err(DbError::Unavailable(_))
        ));
        assert!(store.insert("posts", json!({})).await.is_ok());

        store.clear_failures().await;
        assert!(store.query_by_field("posts", "authorUid", "u1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryDocumentStore::new();
        let doc = store.insert("posts", json!({ "title": "t" })).await.unwrap();
        store.delete("posts", &doc.id).await.unwrap();
        assert!(store.get("posts", &doc.id).await.unwrap().is_none());
        assert_eq!(store.count("posts").await, 0);
        assert!(store.delete("posts", &doc.id).await.is_ok());
    }
}
