use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use vitrine_core::DocumentBackend;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "postgres")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Store operations, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Insert,
    Upsert,
    Get,
    Query,
    Update,
    Delete,
}

/// A stored document: server-managed id and timestamps around a JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: JsonValue,
}

impl Document {
    /// String field of the body, if present.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(JsonValue::as_str)
    }
}

pub(crate) fn ensure_object(data: &JsonValue) -> DbResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(DbError::InvalidDocument(
            "document body must be a JSON object".to_string(),
        ))
    }
}

/// Collection-oriented document persistence.
///
/// Bodies are JSON objects. `created_at` and `updated_at` are assigned by the store,
/// never by the caller.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document with a server-generated id.
    async fn insert(&self, collection: &str, data: JsonValue) -> DbResult<Document>;

    /// Create `id` or deep-merge `data` into it. `created_at` is kept on update.
    async fn upsert(&self, collection: &str, id: &str, data: JsonValue) -> DbResult<Document>;

    async fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// Documents whose string `field` equals `value`, newest first.
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<Document>>;

    /// Deep-merge `patch` into an existing document and bump `updated_at`.
    ///
    /// Fails with [`DbError::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: JsonValue) -> DbResult<Document>;

    /// Remove a document. Removing a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> DbResult<()>;

    fn backend_type(&self) -> DocumentBackend;
}
