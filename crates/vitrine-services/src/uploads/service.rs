use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value as JsonValue};
use vitrine_core::constants::{DEFAULT_STORAGE_PREFIX, PHOTO_UPLOADS_COLLECTION};
use vitrine_core::models::{LocalFile, MetadataPatch, PhotoMetadata, UploadRecord};
use vitrine_core::validation::derive_stored_name;
use vitrine_core::{AppError, ValidationPolicy};
use vitrine_db::DocumentStore;
use vitrine_storage::{build_storage_key, BlobStore, TransferSnapshot};

use super::types::{
    progress_from_snapshot, record_from_document, ProgressSink, UploadOutcome, UploadRecordBody,
};
use crate::errors::{
    blob_delete_failed, document_delete_failed, metadata_write_failed, query_failed,
    update_failed, upload_failed,
};

/// Photo upload orchestrator
///
/// Drives one file at a time through the blob store and records one metadata
/// document per successful transfer. A record is returned only once both steps have
/// succeeded.
#[derive(Clone)]
pub struct PhotoUploadService {
    blobs: Arc<dyn BlobStore>,
    documents: Arc<dyn DocumentStore>,
    storage_prefix: String,
}

impl PhotoUploadService {
    pub fn new(blobs: Arc<dyn BlobStore>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            blobs,
            documents,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
        }
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    /// Upload one file for `owner_id`.
    ///
    /// Validation failures return before any transfer is attempted. If the metadata
    /// write fails after a successful transfer the blob stays in storage and the call
    /// fails with [`AppError::MetadataWriteFailed`].
    #[tracing::instrument(
        skip(self, file, owner_id, policy, on_progress),
        fields(owner_id = %owner_id, file_name = %file.name, size_bytes = file.size_bytes())
    )]
    pub async fn upload(
        &self,
        file: &LocalFile,
        owner_id: &str,
        policy: &ValidationPolicy,
        on_progress: ProgressSink<'_>,
    ) -> Result<UploadRecord, AppError> {
        if owner_id.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        policy.validate(file).map_err(|e| {
            tracing::debug!(reason = %e, "Upload rejected by policy");
            AppError::from(e)
        })?;

        let stored_name = derive_stored_name(&file.name, owner_id);
        let storage_key =
            build_storage_key(&self.storage_prefix, &stored_name).map_err(upload_failed)?;

        let start = Instant::now();
        let forward = |snapshot: TransferSnapshot| on_progress(progress_from_snapshot(snapshot));

        let stored = self
            .blobs
            .upload_resumable(&storage_key, &file.mime_type, file.data.clone(), &forward)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    storage_key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Photo transfer failed"
                );
                upload_failed(e)
            })?;

        let body = UploadRecordBody {
            stored_name,
            original_name: file.name.clone(),
            location_uri: stored.location_uri,
            storage_key: stored.storage_key,
            size_bytes: stored.size_bytes,
            mime_type: file.mime_type.clone(),
            owner_id: owner_id.to_string(),
            metadata: PhotoMetadata::default(),
        };
        let data = serde_json::to_value(&body)?;

        let document = self
            .documents
            .insert(PHOTO_UPLOADS_COLLECTION, data)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    storage_key = %body.storage_key,
                    "Metadata write failed after transfer; blob left orphaned"
                );
                metadata_write_failed(e)
            })?;

        let record = body.into_record(&document);

        tracing::info!(
            record_id = %record.id,
            storage_key = %record.storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Photo uploaded"
        );

        Ok(record)
    }

    /// Upload files strictly one after another.
    ///
    /// A batch larger than the policy cap is rejected up front. Otherwise each file
    /// gets its own outcome, in input order, and a failure never stops later files.
    pub async fn upload_many(
        &self,
        files: &[LocalFile],
        owner_id: &str,
        policy: &ValidationPolicy,
        on_progress: ProgressSink<'_>,
    ) -> Result<Vec<UploadOutcome>, AppError> {
        policy.validate_batch_len(files.len())?;

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            let result = self.upload(file, owner_id, policy, on_progress).await;
            if let Err(ref e) = result {
                tracing::warn!(file_name = %file.name, error = %e, "Batch item failed");
            }
            outcomes.push(UploadOutcome {
                file_name: file.name.clone(),
                result,
            });
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            owner_id = %owner_id,
            total = outcomes.len(),
            succeeded,
            "Batch upload finished"
        );

        Ok(outcomes)
    }

    /// Records owned by `owner_id`, newest first. A failed query yields an empty list.
    pub async fn list_by_owner(&self, owner_id: &str) -> Vec<UploadRecord> {
        self.try_list_by_owner(owner_id).await.unwrap_or_default()
    }

    /// Like [`Self::list_by_owner`] but surfaces the query failure.
    pub async fn try_list_by_owner(&self, owner_id: &str) -> Result<Vec<UploadRecord>, AppError> {
        let documents = self
            .documents
            .query_by_field(PHOTO_UPLOADS_COLLECTION, "ownerId", owner_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, owner_id = %owner_id, "Failed to list photo uploads");
                query_failed(e)
            })?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id.clone();
                match record_from_document(document) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(error = %e, record_id = %id, "Skipping malformed upload record");
                        None
                    }
                }
            })
            .collect())
    }

    /// Delete the blob, then its metadata record. The record is kept when the blob
    /// delete fails.
    #[tracing::instrument(skip(self, id, storage_key), fields(record_id = %id, storage_key = %storage_key))]
    pub async fn remove(&self, id: &str, storage_key: &str) -> Result<(), AppError> {
        self.blobs.delete(storage_key).await.map_err(|e| {
            tracing::error!(error = %e, "Blob delete failed; metadata left in place");
            blob_delete_failed(e)
        })?;

        self.documents
            .delete(PHOTO_UPLOADS_COLLECTION, id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Metadata delete failed after blob removal");
                document_delete_failed(e)
            })?;

        tracing::info!("Photo removed");
        Ok(())
    }

    /// Write only the metadata fields present in `patch`.
    #[tracing::instrument(skip(self, id, patch), fields(record_id = %id))]
    pub async fn update_metadata(&self, id: &str, patch: &MetadataPatch) -> Result<(), AppError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut metadata = Map::new();
        if let Some(alt_text) = &patch.alt_text {
            metadata.insert("altText".to_string(), JsonValue::String(alt_text.clone()));
        }
        if let Some(caption) = &patch.caption {
            metadata.insert("caption".to_string(), JsonValue::String(caption.clone()));
        }
        let mut payload = Map::new();
        payload.insert("metadata".to_string(), JsonValue::Object(metadata));

        self.documents
            .update(PHOTO_UPLOADS_COLLECTION, id, JsonValue::Object(payload))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Metadata update failed");
                update_failed(e)
            })?;
        Ok(())
    }

    /// Fetch one record by id.
    pub async fn get(&self, id: &str) -> Result<Option<UploadRecord>, AppError> {
        let document = self
            .documents
            .get(PHOTO_UPLOADS_COLLECTION, id)
            .await
            .map_err(query_failed)?;
        match document {
            Some(document) => Ok(Some(record_from_document(document)?)),
            None => Ok(None),
        }
    }
}
