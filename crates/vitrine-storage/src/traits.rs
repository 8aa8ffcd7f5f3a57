//! Blob store abstraction trait
//!
//! This module defines the [`BlobStore`] trait that all storage backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// State of a resumable transfer as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Running,
    Paused,
    Success,
    Error,
}

/// One progress observation of an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSnapshot {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub state: TransferState,
}

impl TransferSnapshot {
    pub fn new(bytes_transferred: u64, total_bytes: u64, state: TransferState) -> Self {
        Self {
            bytes_transferred,
            total_bytes,
            state,
        }
    }
}

/// Callback invoked with every snapshot of a transfer.
pub type ProgressCallback<'a> = &'a (dyn Fn(TransferSnapshot) + Send + Sync);

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub storage_key: String,
    /// URI from which the stored bytes can be fetched.
    pub location_uri: String,
    pub size_bytes: u64,
}

/// Blob storage abstraction trait
///
/// All storage backends (S3, local filesystem, in-memory) implement this trait so the
/// upload service works with any of them without coupling to a concrete backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Transfer `data` to `storage_key`, reporting progress through `on_progress`.
    ///
    /// Backends emit a `Running` snapshot after each chunk and finish with exactly one
    /// `Success` or `Error` snapshot. On success the returned object carries the
    /// download URI of the stored bytes.
    async fn upload_resumable(
        &self,
        storage_key: &str,
        content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback<'_>,
    ) -> StorageResult<StoredObject>;

    /// Download the full contents stored under `storage_key`.
    async fn download(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Delete the blob under `storage_key`. Deleting a missing blob succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a blob exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Public URI for a key, without checking that the blob exists.
    fn download_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
