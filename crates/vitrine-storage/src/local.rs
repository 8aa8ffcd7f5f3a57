use crate::keys::validate_storage_key;
use crate::traits::{BlobStore, ProgressCallback, StorageError, StorageResult, StoredObject};
use crate::transfer::{chunked, ProgressReporter};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use vitrine_core::constants::DEFAULT_TRANSFER_CHUNK_SIZE;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    chunk_size: usize,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g., "./data/blobs")
    /// * `base_url` - Base URL the blobs are served from (e.g., "http://localhost:8080/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            chunk_size: DEFAULT_TRANSFER_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with traversal sequences and keys that resolve outside the base
    /// storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_storage_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write every chunk to a temporary sibling, then move it into place. The
    /// sibling is removed when any step fails.
    async fn write_chunks(
        &self,
        path: &Path,
        data: &Bytes,
        reporter: &mut ProgressReporter<'_>,
    ) -> StorageResult<()> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let result = self.write_partial(&partial, path, data, reporter).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(&partial).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        error = %e,
                        path = %partial.display(),
                        "Failed to remove partial upload"
                    );
                }
            }
        }
        result
    }

    async fn write_partial(
        &self,
        partial: &Path,
        path: &Path,
        data: &Bytes,
        reporter: &mut ProgressReporter<'_>,
    ) -> StorageResult<()> {
        let mut file = fs::File::create(partial).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                partial.display(),
                e
            ))
        })?;

        for chunk in chunked(data, self.chunk_size) {
            file.write_all(&chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    partial.display(),
                    e
                ))
            })?;
            reporter.advance(chunk.len());
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", partial.display(), e))
        })?;
        drop(file);

        fs::rename(partial, path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                partial.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn upload_resumable(
        &self,
        storage_key: &str,
        _content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback<'_>,
    ) -> StorageResult<StoredObject> {
        let size = data.len() as u64;
        let mut reporter = ProgressReporter::new(size, on_progress);

        let path = match self.key_to_path(storage_key) {
            Ok(path) => path,
            Err(e) => {
                reporter.fail();
                return Err(e);
            }
        };

        let start = std::time::Instant::now();

        let written = match self.ensure_parent_dir(&path).await {
            Ok(()) => self.write_chunks(&path, &data, &mut reporter).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            reporter.fail();
            tracing::error!(
                error = %e,
                path = %path.display(),
                key = %storage_key,
                size_bytes = size,
                bytes_transferred = reporter.bytes_transferred(),
                "Local storage upload failed"
            );
            return Err(e);
        }

        reporter.succeed();

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredObject {
            storage_key: storage_key.to_string(),
            location_uri: self.generate_url(storage_key),
            size_bytes: size,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn download_url(&self, storage_key: &str) -> String {
        self.generate_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
