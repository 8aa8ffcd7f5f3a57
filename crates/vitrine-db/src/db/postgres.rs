use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use vitrine_core::DocumentBackend;

use super::document::{ensure_object, DbError, DbResult, Document, DocumentStore};
use super::merge::deep_merge;
use super::transaction::TransactionGuard;

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<JsonValue>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            data: row.data.0,
        }
    }
}

/// Document store backed by a single Postgres `documents` table with JSONB bodies.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Lock a row for the rest of the transaction.
    async fn select_for_update(
        tx: &mut TransactionGuard,
        collection: &str,
        id: &str,
    ) -> DbResult<Option<DocumentRow>> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(tx.conn()?)
        .await?;
        Ok(row)
    }

    async fn write_body(
        tx: &mut TransactionGuard,
        collection: &str,
        id: &str,
        data: JsonValue,
    ) -> DbResult<DocumentRow> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            UPDATE documents SET data = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING id, data, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(data))
        .fetch_one(tx.conn()?)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[tracing::instrument(skip(self, data), fields(db.collection = %collection, db.operation = "insert"))]
    async fn insert(&self, collection: &str, data: JsonValue) -> DbResult<Document> {
        ensure_object(&data)?;
        let id = Uuid::new_v4().to_string();

        let row = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self, data), fields(db.collection = %collection, db.operation = "upsert", db.record_id = %id))]
    async fn upsert(&self, collection: &str, id: &str, data: JsonValue) -> DbResult<Document> {
        ensure_object(&data)?;
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let row = match Self::select_for_update(&mut tx, collection, id).await? {
            Some(existing) => {
                let mut body = existing.data.0;
                deep_merge(&mut body, data);
                Self::write_body(&mut tx, collection, id, body).await?
            }
            None => {
                sqlx::query_as::<Postgres, DocumentRow>(
                    r#"
                    INSERT INTO documents (collection, id, data)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (collection, id)
                    DO UPDATE SET data = documents.data || EXCLUDED.data, updated_at = NOW()
                    RETURNING id, data, created_at, updated_at
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(Json(data))
                .fetch_one(tx.conn()?)
                .await?
            }
        };

        tx.commit().await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.collection = %collection, db.operation = "select", db.record_id = %id))]
    async fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let row = sqlx::query_as::<Postgres, DocumentRow>(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self), fields(db.collection = %collection, db.operation = "select"))]
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> DbResult<Vec<Document>> {
        let rows = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND data ->> $2 = $3
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self, patch), fields(db.collection = %collection, db.operation = "update", db.record_id = %id))]
    async fn update(&self, collection: &str, id: &str, patch: JsonValue) -> DbResult<Document> {
        ensure_object(&patch)?;
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let existing = match Self::select_for_update(&mut tx, collection, id).await? {
            Some(row) => row,
            None => {
                tx.rollback().await?;
                return Err(DbError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
        };

        let mut body = existing.data.0;
        deep_merge(&mut body, patch);
        let row = Self::write_body(&mut tx, collection, id, body).await?;

        tx.commit().await?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self), fields(db.collection = %collection, db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, collection: &str, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend_type(&self) -> DocumentBackend {
        DocumentBackend::Postgres
    }
}
