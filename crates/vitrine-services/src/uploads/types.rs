use serde::{Deserialize, Serialize};
use vitrine_core::models::{PhotoMetadata, UploadPhase, UploadProgress, UploadRecord};
use vitrine_core::AppError;
use vitrine_db::Document;
use vitrine_storage::{TransferSnapshot, TransferState};

/// Receives every progress snapshot of the upload in flight.
pub type ProgressSink<'a> = &'a (dyn Fn(UploadProgress) + Send + Sync);

/// Per-file result of a batch upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub result: Result<UploadRecord, AppError>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn record(&self) -> Option<&UploadRecord> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.result.as_ref().err()
    }
}

pub fn progress_from_snapshot(snapshot: TransferSnapshot) -> UploadProgress {
    let phase = match snapshot.state {
        TransferState::Running => UploadPhase::Running,
        TransferState::Paused => UploadPhase::Paused,
        TransferState::Success => UploadPhase::Success,
        TransferState::Error => UploadPhase::Error,
    };
    UploadProgress::new(snapshot.bytes_transferred, snapshot.total_bytes, phase)
}

/// Body of a `photoUploads` document. `id` and `createdAt` are owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadRecordBody {
    pub stored_name: String,
    pub original_name: String,
    pub location_uri: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub owner_id: String,
    #[serde(default)]
    pub metadata: PhotoMetadata,
}

impl UploadRecordBody {
    pub fn into_record(self, document: &Document) -> UploadRecord {
        UploadRecord {
            id: document.id.clone(),
            stored_name: self.stored_name,
            original_name: self.original_name,
            location_uri: self.location_uri,
            storage_key: self.storage_key,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type,
            owner_id: self.owner_id,
            created_at: document.created_at,
            metadata: self.metadata,
        }
    }
}

pub(crate) fn record_from_document(document: Document) -> Result<UploadRecord, serde_json::Error> {
    let body: UploadRecordBody = serde_json::from_value(document.data.clone())?;
    Ok(body.into_record(&document))
}
