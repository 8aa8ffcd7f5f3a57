use crate::keys::validate_storage_key;
use crate::traits::{BlobStore, ProgressCallback, StorageError, StorageResult, StoredObject};
use crate::transfer::{chunked, ProgressReporter};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{MultipartUpload, ObjectStoreExt, PutPayload, Result as ObjectResult};
use vitrine_core::constants::DEFAULT_TRANSFER_CHUNK_SIZE;

/// S3 rejects multipart parts smaller than this, except for the last one.
const MIN_MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    chunk_size: usize,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            chunk_size: DEFAULT_TRANSFER_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn part_size(&self) -> usize {
        self.chunk_size.max(MIN_MULTIPART_PART_SIZE)
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, path-style under the endpoint.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    async fn put_single(
        &self,
        location: &Path,
        data: Bytes,
        reporter: &mut ProgressReporter<'_>,
    ) -> StorageResult<()> {
        let len = data.len();
        let result: ObjectResult<_> = self.store.put(location, PutPayload::from(data)).await;
        result.map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        reporter.advance(len);
        Ok(())
    }

    async fn put_parts(
        &self,
        location: &Path,
        data: Bytes,
        reporter: &mut ProgressReporter<'_>,
    ) -> StorageResult<()> {
        let mut upload: Box<dyn MultipartUpload> = self
            .store
            .put_multipart(location)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        for part in chunked(&data, self.part_size()) {
            let len = part.len();
            if let Err(e) = upload.put_part(PutPayload::from(part)).await {
                if let Err(abort_err) = upload.abort().await {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %self.bucket,
                        key = %location,
                        "Failed to abort S3 multipart upload"
                    );
                }
                return Err(StorageError::UploadFailed(e.to_string()));
            }
            reporter.advance(len);
        }

        upload
            .complete()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    async fn upload_resumable(
        &self,
        storage_key: &str,
        _content_type: &str,
        data: Bytes,
        on_progress: ProgressCallback<'_>,
    ) -> StorageResult<StoredObject> {
        let size = data.len() as u64;
        let mut reporter = ProgressReporter::new(size, on_progress);

        if let Err(e) = validate_storage_key(storage_key) {
            reporter.fail();
            return Err(e);
        }

        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result = if data.len() <= self.part_size() {
            self.put_single(&location, data, &mut reporter).await
        } else {
            self.put_parts(&location, data, &mut reporter).await
        };

        if let Err(e) = result {
            reporter.fail();
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                bytes_transferred = reporter.bytes_transferred(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            return Err(e);
        }

        reporter.succeed();

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(StoredObject {
            storage_key: storage_key.to_string(),
            location_uri: self.generate_url(storage_key),
            size_bytes: size,
        })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_storage_key(storage_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn download_url(&self, storage_key: &str) -> String {
        self.generate_url(storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(endpoint: Option<&str>) -> S3Storage {
        S3Storage::new(
            "vitrine-photos".to_string(),
            "eu-west-1".to_string(),
            endpoint.map(String::from),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_aws_url_format() {
        let storage = storage(None).await;
        assert_eq!(
            storage.download_url("photos/a.png"),
            "https://vitrine-photos.s3.eu-west-1.amazonaws.com/photos/a.png"
        );
    }

    #[tokio::test]
    async fn test_custom_endpoint_uses_path_style() {
        let storage = storage(Some("http://localhost:9000/")).await;
        assert_eq!(
            storage.download_url("photos/a.png"),
            "http://localhost:9000/vitrine-photos/photos/a.png"
        );
    }

    #[tokio::test]
    async fn test_part_size_respects_s3_minimum() {
        let storage = storage(None).await.with_chunk_size(1024);
        assert_eq!(storage.part_size(), MIN_MULTIPART_PART_SIZE);

        let storage = storage.with_chunk_size(8 * 1024 * 1024);
        assert_eq!(storage.part_size(), 8 * 1024 * 1024);
    }
}
