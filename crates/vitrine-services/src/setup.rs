//! Service construction from configuration
//!
//! Backends are created once and shared by every service through `Arc`s.

use std::sync::Arc;

use vitrine_core::{AppError, Config, ValidationPolicy};
use vitrine_db::{create_document_store, DocumentStore};
use vitrine_storage::{create_storage, BlobStore};

use crate::auth::{AuthService, IdentityProvider, MemoryIdentityProvider};
use crate::posts::PostService;
use crate::profiles::UserProfileService;
use crate::uploads::PhotoUploadService;

/// The external collaborators every service talks to.
#[derive(Clone)]
pub struct Backends {
    pub storage: Arc<dyn BlobStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backends {
    /// Storage and document store selected by `config`. Identity is always the
    /// in-process provider; swap `identity` to use another one.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let storage = create_storage(config).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize blob storage");
            AppError::Config(e.to_string())
        })?;
        let documents = create_document_store(config).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize document store");
            AppError::Config(e.to_string())
        })?;

        tracing::info!(
            storage_backend = ?storage.backend_type(),
            document_backend = ?documents.backend_type(),
            "Backends initialized"
        );

        Ok(Self {
            storage,
            documents,
            identity: Arc::new(MemoryIdentityProvider::new()),
        })
    }
}

#[derive(Clone)]
pub struct Services {
    pub uploads: PhotoUploadService,
    pub posts: PostService,
    pub profiles: UserProfileService,
    pub auth: AuthService,
    pub upload_policy: ValidationPolicy,
}

impl Services {
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let backends = Backends::from_config(config).await?;
        Ok(Self::from_backends(backends, config))
    }

    pub fn from_backends(backends: Backends, config: &Config) -> Self {
        let uploads = PhotoUploadService::new(backends.storage, backends.documents.clone())
            .with_storage_prefix(config.storage_prefix.clone());

        Self {
            uploads,
            posts: PostService::new(backends.documents.clone()),
            profiles: UserProfileService::new(backends.documents),
            auth: AuthService::new(backends.identity),
            upload_policy: config.upload_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::{DocumentBackend, StorageBackend};

    fn memory_config() -> Config {
        Config {
            storage_backend: StorageBackend::Memory,
            document_backend: DocumentBackend::Memory,
            max_file_size_bytes: 1024,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_initialize_from_memory_config() {
        let services = Services::initialize(&memory_config()).await.unwrap();
        assert_eq!(services.upload_policy.max_size_bytes, 1024);
        assert!(services.uploads.list_by_owner("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = Config {
            storage_backend: StorageBackend::S3,
            s3_bucket: None,
            ..memory_config()
        };
        assert!(matches!(
            Services::initialize(&config).await,
            Err(AppError::Config(_))
        ));
    }
}
