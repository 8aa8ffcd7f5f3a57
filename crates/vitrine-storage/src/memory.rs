//! In-memory blob store.
//!
//! Used by the `memory` storage backend and by tests. Faults can be injected to
//! exercise failure paths: uploads whose key contains a pattern fail after the first
//! chunk, and deletes can be made to fail.

use crate::keys::validate_storage_key;
use crate::traits::{BlobStore, ProgressCallback, StorageError, StorageResult, StoredObject};
use crate::transfer::{chunked, ProgressReporter};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use vitrine_core::constants::DEFAULT_TRANSFER_CHUNK_SIZE;

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Bytes,
}

/// Blob store that keeps every object in process memory.
#[derive(Clone)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
    base_url: String,
    chunk_size: usize,
    chunk_latency: Option<Duration>,
    failing_upload_pattern: Arc<RwLock<Option<String>>>,
    fail_deletes: Arc<AtomicBool>,
    upload_attempts: Arc<AtomicUsize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_base_url("memory://blobs")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into(),
            chunk_size: DEFAULT_TRANSFER_CHUNK_SIZE,
            chunk_latency: None,
            failing_upload_pattern: Arc::new(RwLock::new(None)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
            upload_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sleep for `latency` after every chunk, so transfers overlap in tests.
    pub fn with_chunk_latency(mut self, latency: Duration) -> Self {
        self.chunk_latency = Some(latency);
        self
    }

    /// Fail every upload whose storage key contains `pattern`. An empty pattern
    /// fails every upload.
    pub async fn fail_uploads_matching(&self, pattern: impl Into<String>) {
        *self.failing_upload_pattern.write().await = Some(pattern.into());
    }

    pub async fn clear_upload_failures(&self) {
        *self.failing_upload_pattern.write().await = None;
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of transfers started, successful or not.
    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.load(Ordering::SeqCst)
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn content_type(&self, storage_key: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(storage_key)
            .map(|blob| blob.content_type.clone())
    }

    async fn should_fail_upload(&self, storage_key: &str) -> bool {
        match self.failing_upload_pattern.read().await.as_deref() {
            Some(pattern) => storage_key.contains(pattern),
            None => false,
        }
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn upload_resumable(
        &self,
        storage_key: &str,
        content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback<'_>,
    ) -> StorageResult<StoredObject> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        let size = data.len() as u64;
        let mut reporter = ProgressReporter::new(size, on_progress);

        if let Err(e) = validate_storage_key(storage_key) {
            reporter.fail();
            return Err(e);
        }

        let fail = self.should_fail_upload(storage_key).await;

        for chunk in chunked(&data, self.chunk_size) {
            reporter.advance(chunk.len());
            if let Some(latency) = self.chunk_latency {
                tokio::time::sleep(latency).await;
            }
            if fail {
                break;
            }
        }

        if fail {
            reporter.fail();
            tracing::error!(key = %storage_key, "Injected upload failure");
            return Err(StorageError::UploadFailed(format!(
                "transfer of {} was interrupted",
                storage_key
            )));
        }

        self.blobs.write().await.insert(
            storage_key.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );
        reporter.succeed();

        tracing::debug!(key = %storage_key, size_bytes = size, "Memory storage upload successful");

        Ok(StoredObject {
            storage_key: storage_key.to_string(),
            location_uri: self.generate_url(storage_key),
            size_bytes: size,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.blobs
            .read()
            .await
            .get(storage_key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_storage_key(storage_key)?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "delete of {} rejected",
                storage_key
            )));
        }
        self.blobs.write().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.blobs.read().await.contains_key(storage_key))
    }

    fn download_url(&self, storage_key: &str) -> String {
        self.generate_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{TransferSnapshot, TransferState};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_upload_then_download() {
        let storage = MemoryStorage::new();
        let stored = storage
            .upload_resumable("photos/a.png", "image/png", Bytes::from_static(b"abc"), &|_| {})
            .await
            .unwrap();

        assert_eq!(stored.location_uri, "memory://blobs/photos/a.png");
        assert_eq!(
            storage.download("photos/a.png").await.unwrap(),
            Bytes::from_static(b"abc")
        );
        assert_eq!(
            storage.content_type("photos/a.png").await.as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn test_injected_upload_failure_reports_error_snapshot() {
        let storage = MemoryStorage::new().with_chunk_size(2);
        storage.fail_uploads_matching("broken").await;
        let seen = Mutex::new(Vec::new());

        let result = storage
            .upload_resumable(
                "photos/broken.png",
                "image/png",
                Bytes::from_static(b"abcdef"),
                &|s: TransferSnapshot| seen.lock().unwrap().push(s),
            )
            .await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(!storage.exists("photos/broken.png").await.unwrap());
        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                TransferSnapshot::new(2, 6, TransferState::Running),
                TransferSnapshot::new(2, 6, TransferState::Error),
            ]
        );

        // other keys are unaffected
        assert!(storage
            .upload_resumable("photos/fine.png", "image/png", Bytes::from_static(b"x"), &|_| {})
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_blob() {
        let storage = MemoryStorage::new();
        storage
            .upload_resumable("photos/a.png", "image/png", Bytes::from_static(b"x"), &|_| {})
            .await
            .unwrap();

        storage.set_fail_deletes(true);
        assert!(matches!(
            storage.delete("photos/a.png").await,
            Err(StorageError::DeleteFailed(_))
        ));
        assert!(storage.exists("photos/a.png").await.unwrap());

        storage.set_fail_deletes(false);
        storage.delete("photos/a.png").await.unwrap();
        assert_eq!(storage.blob_count().await, 0);
    }
}
