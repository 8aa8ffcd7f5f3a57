//! Photo upload state for one gallery view.
//!
//! `loading` (list fetch, delete, edit) and `uploading` are independent flags: the
//! view can refresh the list while an upload is in flight.

use std::sync::Arc;

use tokio::sync::watch;
use vitrine_core::models::{LocalFile, MetadataPatch, UploadProgress, UploadRecord};
use vitrine_core::{AppError, ValidationPolicy};
use vitrine_services::{PhotoUploadService, UploadOutcome};

const LOAD_FAILED: &str = "failed to load images";
const DELETE_FAILED: &str = "failed to delete image";
const UPDATE_FAILED: &str = "failed to update image";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSnapshot {
    pub owner_id: Option<String>,
    /// Newest first.
    pub records: Vec<UploadRecord>,
    pub loading: bool,
    pub uploading: bool,
    /// Progress of the transfer in flight, cleared when it settles.
    pub progress: Option<UploadProgress>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct PhotoUploads {
    service: PhotoUploadService,
    state: Arc<watch::Sender<UploadSnapshot>>,
}

impl PhotoUploads {
    pub fn new(service: PhotoUploadService) -> Self {
        let (state, _) = watch::channel(UploadSnapshot::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.state.borrow().clone()
    }

    /// Bind the view to a user. Switching users drops the previous user's records.
    pub fn set_owner(&self, owner_id: Option<String>) {
        self.state.send_if_modified(|s| {
            if s.owner_id == owner_id {
                return false;
            }
            s.owner_id = owner_id;
            s.records.clear();
            s.error = None;
            true
        });
    }

    fn owner_id(&self) -> Option<String> {
        self.state.borrow().owner_id.clone()
    }

    /// Replace the list with the owner's records. Without an owner the list is
    /// cleared and nothing is fetched.
    pub async fn load(&self) {
        let Some(owner_id) = self.owner_id() else {
            self.state.send_modify(|s| s.records.clear());
            return;
        };

        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.service.try_list_by_owner(&owner_id).await;
        self.state.send_modify(|s| {
            match result {
                Ok(records) => s.records = records,
                Err(_) => s.error = Some(LOAD_FAILED.to_string()),
            }
            s.loading = false;
        });
    }

    /// Upload one file, streaming progress into the state. A successful record is
    /// prepended to the list without re-fetching.
    pub async fn upload_one(&self, file: &LocalFile, policy: &ValidationPolicy) -> UploadOutcome {
        let Some(owner_id) = self.owner_id() else {
            let err = AppError::Unauthenticated;
            self.state.send_modify(|s| s.error = Some(err.to_string()));
            return UploadOutcome {
                file_name: file.name.clone(),
                result: Err(err),
            };
        };

        self.state.send_modify(|s| {
            s.uploading = true;
            s.progress = None;
            s.error = None;
        });

        let sink = |progress: UploadProgress| {
            self.state.send_modify(|s| s.progress = Some(progress));
        };
        let result = self.service.upload(file, &owner_id, policy, &sink).await;

        self.state.send_modify(|s| {
            match &result {
                Ok(record) => s.records.insert(0, record.clone()),
                Err(e) => s.error = Some(e.to_string()),
            }
            s.uploading = false;
            s.progress = None;
        });

        UploadOutcome {
            file_name: file.name.clone(),
            result,
        }
    }

    /// Upload files one after another, in order. An oversized batch is refused
    /// before any transfer.
    pub async fn upload_batch(
        &self,
        files: &[LocalFile],
        policy: &ValidationPolicy,
    ) -> Result<Vec<UploadOutcome>, AppError> {
        if let Err(e) = policy.validate_batch_len(files.len()) {
            self.state.send_modify(|s| s.error = Some(e.to_string()));
            return Err(e.into());
        }

        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            outcomes.push(self.upload_one(file, policy).await);
        }
        Ok(outcomes)
    }

    /// Delete a record. The list changes only after the backend confirms.
    pub async fn remove(&self, id: &str, storage_key: &str) -> bool {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let result = self.service.remove(id, storage_key).await;
        let removed = result.is_ok();
        self.state.send_modify(|s| {
            if removed {
                s.records.retain(|r| r.id != id);
            } else {
                s.error = Some(DELETE_FAILED.to_string());
            }
            s.loading = false;
        });
        removed
    }

    /// Edit caption and/or alt text. Local state merges exactly the fields sent.
    pub async fn edit_metadata(&self, id: &str, patch: &MetadataPatch) -> bool {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        let updated = self.service.update_metadata(id, patch).await.is_ok();
        self.state.send_modify(|s| {
            if updated {
                if let Some(record) = s.records.iter_mut().find(|r| r.id == id) {
                    patch.apply_to(&mut record.metadata);
                }
            } else {
                s.error = Some(UPDATE_FAILED.to_string());
            }
            s.loading = false;
        });
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_services::{MemoryDocumentStore, MemoryStorage, StoreOperation};

    fn holder() -> (MemoryStorage, MemoryDocumentStore, PhotoUploads) {
        let storage = MemoryStorage::new().with_chunk_size(4);
        let documents = MemoryDocumentStore::new();
        let service =
            PhotoUploadService::new(Arc::new(storage.clone()), Arc::new(documents.clone()));
        (storage, documents, PhotoUploads::new(service))
    }

    fn png(name: &str) -> LocalFile {
        LocalFile::new(name, "image/png", vec![1u8; 10])
    }

    #[tokio::test]
    async fn test_upload_without_owner_is_unauthenticated() {
        let (storage, _, photos) = holder();
        let outcome = photos
            .upload_one(&png("a.png"), &ValidationPolicy::default())
            .await;
        assert_eq!(outcome.error(), Some(&AppError::Unauthenticated));
        assert_eq!(
            photos.snapshot().error.as_deref(),
            Some("User not authenticated")
        );
        assert_eq!(storage.upload_attempts(), 0);
    }

    #[tokio::test]
    async fn test_upload_prepends_and_clears_transient_state() {
        let (_, _, photos) = holder();
        photos.set_owner(Some("u1".to_string()));
        let policy = ValidationPolicy::default();

        photos.upload_one(&png("a.png"), &policy).await;
        photos.upload_one(&png("b.png"), &policy).await;

        let snapshot = photos.snapshot();
        let names: Vec<_> = snapshot
            .records
            .iter()
            .map(|r| r.original_name.as_str())
            .collect();
        assert_eq!(names, vec!["b.png", "a.png"]);
        assert!(!snapshot.uploading);
        assert!(snapshot.progress.is_none());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_validation_failure_records_message() {
        let (storage, _, photos) = holder();
        photos.set_owner(Some("u1".to_string()));
        let outcome = photos
            .upload_one(
                &LocalFile::new("a.bmp", "image/bmp", vec![0u8; 3]),
                &ValidationPolicy::default(),
            )
            .await;
        assert!(!outcome.is_success());
        assert!(photos
            .snapshot()
            .error
            .unwrap()
            .starts_with("File type not allowed"));
        assert_eq!(storage.upload_attempts(), 0);
    }

    #[tokio::test]
    async fn test_load_without_owner_clears() {
        let (_, documents, photos) = holder();
        photos.load().await;
        assert!(photos.snapshot().records.is_empty());
        assert_eq!(documents.count("photoUploads").await, 0);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_list() {
        let (_, documents, photos) = holder();
        photos.set_owner(Some("u1".to_string()));
        photos
            .upload_one(&png("a.png"), &ValidationPolicy::default())
            .await;

        documents
            .fail_operation(StoreOperation::Query)
            .await;
        photos.load().await;

        let snapshot = photos.snapshot();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some(LOAD_FAILED));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_refused() {
        let (storage, _, photos) = holder();
        photos.set_owner(Some("u1".to_string()));
        let policy = ValidationPolicy {
            max_files_per_batch: 1,
            ..ValidationPolicy::default()
        };
        let result = photos
            .upload_batch(&[png("a.png"), png("b.png")], &policy)
            .await;
        assert!(result.is_err());
        assert_eq!(storage.upload_attempts(), 0);
    }
}
