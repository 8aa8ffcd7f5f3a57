use std::sync::Arc;

use vitrine_core::{Config, DocumentBackend};

use crate::db::document::{DbError, DbResult, DocumentStore};
use crate::db::memory::MemoryDocumentStore;

/// Create a document store based on configuration.
///
/// The Postgres backend connects, applies migrations, and then serves requests.
pub async fn create_document_store(config: &Config) -> DbResult<Arc<dyn DocumentStore>> {
    match config.document_backend {
        DocumentBackend::Memory => {
            tracing::info!("Using in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
        #[cfg(feature = "postgres")]
        DocumentBackend::Postgres => {
            use std::time::Duration;

            let url = config.database_url.as_deref().ok_or_else(|| {
                DbError::Unavailable("DATABASE_URL not configured".to_string())
            })?;

            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(url)
                .await?;

            tracing::info!(
                max_connections = config.db_max_connections,
                "Database connected successfully"
            );

            let store = crate::db::postgres::PgDocumentStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        DocumentBackend::Postgres => Err(DbError::Unavailable(
            "Postgres document store not available (postgres feature not enabled)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let store = create_document_store(&Config::default()).await.unwrap();
        assert_eq!(store.backend_type(), DocumentBackend::Memory);
    }

    #[tokio::test]
    async fn test_postgres_requires_url() {
        let config = Config {
            document_backend: DocumentBackend::Postgres,
            database_url: None,
            ..Config::default()
        };
        assert!(matches!(
            create_document_store(&config).await,
            Err(DbError::Unavailable(_))
        ));
    }
}
