use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file selected locally, not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Mutable, user-editable part of an upload record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Partial metadata edit. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl MetadataPatch {
    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..Self::default()
        }
    }

    pub fn alt_text(alt_text: impl Into<String>) -> Self {
        Self {
            alt_text: Some(alt_text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alt_text.is_none() && self.caption.is_none()
    }

    /// Merge into existing metadata; omitted fields are left untouched.
    pub fn apply_to(&self, metadata: &mut PhotoMetadata) {
        if let Some(alt_text) = &self.alt_text {
            metadata.alt_text = Some(alt_text.clone());
        }
        if let Some(caption) = &self.caption {
            metadata.caption = Some(caption.clone());
        }
    }
}

/// One stored image and its metadata.
///
/// Only ever constructed after both the blob transfer and the metadata write have
/// succeeded, so `location_uri` and `stored_name` are always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub stored_name: String,
    pub original_name: String,
    pub location_uri: String,
    pub storage_key: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: PhotoMetadata,
}

impl UploadRecord {
    /// Case-insensitive substring match over original name, alt text, and caption.
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        contains(&self.original_name)
            || self.metadata.alt_text.as_deref().is_some_and(contains)
            || self.metadata.caption.as_deref().is_some_and(contains)
    }
}

/// Transfer phase, mirroring the provider's reported state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    Running,
    Paused,
    Success,
    Error,
}

/// Transient progress snapshot for the upload in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub percentage: f64,
    pub phase: UploadPhase,
}

impl UploadProgress {
    pub fn new(bytes_transferred: u64, total_bytes: u64, phase: UploadPhase) -> Self {
        let percentage = if total_bytes == 0 {
            if phase == UploadPhase::Success {
                100.0
            } else {
                0.0
            }
        } else {
            (bytes_transferred as f64 / total_bytes as f64) * 100.0
        };

        Self {
            bytes_transferred,
            total_bytes,
            percentage,
            phase,
        }
    }
}
