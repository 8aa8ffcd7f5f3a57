use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_FILES_PER_BATCH, DEFAULT_MAX_FILE_SIZE_BYTES,
};
use crate::error::ValidationError;
use crate::models::LocalFile;

/// Per-file upload policy, checked before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub max_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
    pub max_files_per_batch: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_files_per_batch: DEFAULT_MAX_FILES_PER_BATCH,
        }
    }
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; q=1" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

impl ValidationPolicy {
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Check size first, then type. Pure function of the file metadata and the policy.
    pub fn validate_metadata(&self, size_bytes: u64, mime_type: &str) -> Result<(), ValidationError> {
        if size_bytes > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size_bytes,
                max_bytes: self.max_size_bytes,
            });
        }

        let normalized = normalize_mime_type(mime_type);
        if !self
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.to_lowercase() == normalized)
        {
            return Err(ValidationError::UnsupportedType {
                mime_type: mime_type.to_string(),
                allowed: self.allowed_mime_types.clone(),
            });
        }

        Ok(())
    }

    pub fn validate(&self, file: &LocalFile) -> Result<(), ValidationError> {
        self.validate_metadata(file.size_bytes(), &file.mime_type)
    }

    /// Reject a batch larger than the configured cap before anything is transferred.
    pub fn validate_batch_len(&self, count: usize) -> Result<(), ValidationError> {
        if count > self.max_files_per_batch {
            return Err(ValidationError::TooManyFiles {
                count,
                max: self.max_files_per_batch,
            });
        }
        Ok(())
    }
}

static LAST_TIMESTAMP_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Wall-clock milliseconds, strictly increasing across calls within this process.
pub fn next_timestamp_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_TIMESTAMP_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_TIMESTAMP_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

/// Split `name` into base and extension at the last dot. The extension keeps the dot
/// and its original case. A name without a dot, or whose last dot sits inside a
/// directory component, has an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let last_separator = name.rfind(['/', '\\']);
    match name.rfind('.') {
        Some(idx) if last_separator.map_or(true, |sep| idx > sep) => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Replace every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_base_name(base: &str) -> String {
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `{owner_id}_{millis}_{sanitized base}{extension}` for an explicit timestamp.
///
/// Directory separators in `original_name` are part of the base and come out as `_`.
pub fn derive_stored_name_at(original_name: &str, owner_id: &str, millis: i64) -> String {
    let (base, extension) = split_extension(original_name);
    format!(
        "{}_{}_{}{}",
        owner_id,
        millis,
        sanitize_base_name(base),
        extension
    )
}

/// Derive the collision-resistant storage name for an upload.
pub fn derive_stored_name(original_name: &str, owner_id: &str) -> String {
    derive_stored_name_at(original_name, owner_id, next_timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(size: usize, mime: &str) -> LocalFile {
        LocalFile::new("photo.jpg", mime, vec![0u8; size])
    }

    #[test]
    fn test_default_policy() {
        let policy = ValidationPolicy::default();
        assert_eq!(policy.max_size_bytes, 5 * 1024 * 1024);
        assert_eq!(
            policy.allowed_mime_types,
            vec!["image/jpeg", "image/png", "image/webp", "image/gif"]
        );
    }

    #[test]
    fn test_too_large_rejected_with_size_reason() {
        let policy = ValidationPolicy::default().with_max_size_bytes(1024);
        let err = policy.validate(&file(1025, "image/jpeg")).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { max_bytes: 1024, .. }));
        assert!(policy.validate(&file(1024, "image/jpeg")).is_ok());
    }

    #[test]
    fn test_size_checked_before_type() {
        let policy = ValidationPolicy::default().with_max_size_bytes(10);
        let err = policy.validate(&file(11, "application/pdf")).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn test_unsupported_type_rejected_with_type_reason() {
        let policy = ValidationPolicy::default();
        let err = policy.validate(&file(10, "image/bmp")).unwrap_err();
        match err {
            ValidationError::UnsupportedType { mime_type, allowed } => {
                assert_eq!(mime_type, "image/bmp");
                assert_eq!(allowed.len(), 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mime_parameters_and_case_ignored() {
        let policy = ValidationPolicy::default();
        assert!(policy.validate(&file(10, "Image/PNG; charset=binary")).is_ok());
    }

    #[test]
    fn test_batch_cap() {
        let policy = ValidationPolicy::default();
        assert!(policy.validate_batch_len(10).is_ok());
        assert!(matches!(
            policy.validate_batch_len(11),
            Err(ValidationError::TooManyFiles { count: 11, max: 10 })
        ));
    }

    #[test]
    fn test_stored_name_format() {
        let name = derive_stored_name_at("My Holiday (1).JPG", "uid42", 1700000000123);
        assert_eq!(name, "uid42_1700000000123_My_Holiday__1_.JPG");
    }

    #[test]
    fn test_stored_name_keeps_only_last_extension() {
        let name = derive_stored_name_at("archive.tar.gz", "u", 1);
        assert_eq!(name, "u_1_archive_tar.gz");
    }

    #[test]
    fn test_stored_name_without_extension() {
        assert_eq!(derive_stored_name_at("README", "u", 5), "u_5_README");
    }

    #[test]
    fn test_stored_name_sanitizes_directories() {
        assert_eq!(derive_stored_name_at("dir/photo.png", "u", 1), "u_1_dir_photo.png");
        let name = derive_stored_name_at("../../etc/passwd.png", "u", 9);
        assert_eq!(name, "u_9______etc_passwd.png");
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_dot_inside_directory_is_not_an_extension() {
        assert_eq!(derive_stored_name_at("v1.2\\notes", "u", 3), "u_3_v1_2_notes");
        assert_eq!(split_extension("a.b/c"), ("a.b/c", ""));
    }

    #[test]
    fn test_stored_names_are_unique_across_calls() {
        let a = derive_stored_name("cat.png", "owner");
        let b = derive_stored_name("cat.png", "owner");
        assert_ne!(a, b);
        assert!(a.ends_with(".png") && b.ends_with(".png"));
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut previous = next_timestamp_millis();
        for _ in 0..1000 {
            let next = next_timestamp_millis();
            assert!(next > previous);
            previous = next;
        }
    }
}
