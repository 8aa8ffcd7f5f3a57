//! Gallery view model: search text, layout, and the edit draft.
//!
//! Holds no records of its own. Filtering runs over the slice the caller passes in
//! and every mutation is handed back through a callback.

use serde::{Deserialize, Serialize};
use vitrine_core::format_file_size;
use vitrine_core::models::{MetadataPatch, UploadRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// Metadata being edited for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDraft {
    pub record_id: String,
    pub alt_text: String,
    pub caption: String,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    search: String,
    view_mode: ViewMode,
    editing: Option<EditDraft>,
}

impl GalleryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }

    /// Records whose original name, alt text, or caption contains the search text,
    /// ignoring case. Input order is kept.
    pub fn visible<'a>(&self, records: &'a [UploadRecord]) -> Vec<&'a UploadRecord> {
        let needle = self.search.to_lowercase();
        records
            .iter()
            .filter(|record| record.matches_lowercase(&needle))
            .collect()
    }

    /// "Showing N of M images"
    pub fn summary(&self, records: &[UploadRecord]) -> String {
        format!(
            "Showing {} of {} images",
            self.visible(records).len(),
            records.len()
        )
    }

    pub fn size_label(record: &UploadRecord) -> String {
        format_file_size(record.size_bytes)
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    /// Open a draft pre-filled with the record's current metadata.
    pub fn start_edit(&mut self, record: &UploadRecord) {
        self.editing = Some(EditDraft {
            record_id: record.id.clone(),
            alt_text: record.metadata.alt_text.clone().unwrap_or_default(),
            caption: record.metadata.caption.clone().unwrap_or_default(),
        });
    }

    pub fn set_draft_alt_text(&mut self, alt_text: impl Into<String>) {
        if let Some(draft) = self.editing.as_mut() {
            draft.alt_text = alt_text.into();
        }
    }

    pub fn set_draft_caption(&mut self, caption: impl Into<String>) {
        if let Some(draft) = self.editing.as_mut() {
            draft.caption = caption.into();
        }
    }

    /// Hand the draft to `on_edit` and close it. Returns whatever the callback
    /// returns, or `None` when no draft was open.
    pub fn save_edit<F, R>(&mut self, on_edit: F) -> Option<R>
    where
        F: FnOnce(&str, MetadataPatch) -> R,
    {
        let draft = self.editing.take()?;
        let patch = MetadataPatch {
            alt_text: Some(draft.alt_text),
            caption: Some(draft.caption),
        };
        Some(on_edit(&draft.record_id, patch))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn request_delete<F, R>(&self, record: &UploadRecord, on_delete: F) -> R
    where
        F: FnOnce(&str, &str) -> R,
    {
        on_delete(&record.id, &record.storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vitrine_core::models::PhotoMetadata;

    fn record(id: &str, name: &str, alt: Option<&str>, caption: Option<&str>) -> UploadRecord {
        UploadRecord {
            id: id.to_string(),
            stored_name: format!("u1_1_{}", name),
            original_name: name.to_string(),
            location_uri: format!("memory://blobs/photos/{}", name),
            storage_key: format!("photos/{}", name),
            size_bytes: 1536,
            mime_type: "image/jpeg".to_string(),
            owner_id: "u1".to_string(),
            created_at: Utc::now(),
            metadata: PhotoMetadata {
                alt_text: alt.map(String::from),
                caption: caption.map(String::from),
                ..PhotoMetadata::default()
            },
        }
    }

    fn records() -> Vec<UploadRecord> {
        vec![
            record("1", "Beach.jpg", None, None),
            record("2", "img_002.jpg", Some("Sunset at the BEACH"), None),
            record("3", "img_003.jpg", None, Some("mountain hike")),
        ]
    }

    #[test]
    fn test_filter_matches_any_field_ignoring_case() {
        let records = records();
        let mut view = GalleryView::new();

        view.set_search("beach");
        let ids: Vec<_> = view.visible(&records).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        view.set_search("HIKE");
        assert_eq!(view.visible(&records).len(), 1);
        assert_eq!(view.summary(&records), "Showing 1 of 3 images");

        view.set_search("");
        assert_eq!(view.visible(&records).len(), 3);
    }

    #[test]
    fn test_view_mode_defaults_to_grid() {
        let mut view = GalleryView::new();
        assert_eq!(view.view_mode(), ViewMode::Grid);
        view.set_view_mode(ViewMode::List);
        assert_eq!(view.view_mode(), ViewMode::List);
    }

    #[test]
    fn test_edit_draft_round_trip() {
        let records = records();
        let mut view = GalleryView::new();
        view.start_edit(&records[1]);
        assert_eq!(view.editing().unwrap().alt_text, "Sunset at the BEACH");

        view.set_draft_caption("golden hour");
        let sent = view.save_edit(|id, patch| (id.to_string(), patch));
        let (id, patch) = sent.unwrap();
        assert_eq!(id, "2");
        assert_eq!(patch.caption.as_deref(), Some("golden hour"));
        assert_eq!(patch.alt_text.as_deref(), Some("Sunset at the BEACH"));
        assert!(view.editing().is_none());

        assert!(view.save_edit(|_, _| ()).is_none());
    }

    #[test]
    fn test_cancel_and_delete_callbacks() {
        let records = records();
        let mut view = GalleryView::new();
        view.start_edit(&records[0]);
        view.cancel_edit();
        assert!(view.editing().is_none());

        let key = view.request_delete(&records[2], |_, key| key.to_string());
        assert_eq!(key, "photos/img_003.jpg");
        assert_eq!(GalleryView::size_label(&records[0]), "1.5 KB");
    }
}
