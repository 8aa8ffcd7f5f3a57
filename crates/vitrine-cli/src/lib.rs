use std::path::Path;

use anyhow::Context;
use vitrine_core::format_file_size;
use vitrine_core::models::{LocalFile, UploadRecord};

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default filter.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vitrine=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

/// MIME type from the file extension, or `application/octet-stream`.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Read a file from disk into a [`LocalFile`] named after its last path segment.
pub async fn read_local_file(path: &Path) -> anyhow::Result<LocalFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(LocalFile::new(name, guess_mime_type(path), data))
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// One table row per record: id, name, size, caption.
pub fn format_record_table(records: &[&UploadRecord]) -> String {
    let mut out = format!("{:<36}  {:<30}  {:>10}  {}\n", "ID", "NAME", "SIZE", "CAPTION");
    for record in records {
        out.push_str(&format!(
            "{:<36}  {:<30}  {:>10}  {}\n",
            record.id,
            truncate_string(&record.original_name, 30),
            format_file_size(record.size_bytes),
            record.metadata.caption.as_deref().unwrap_or("-"),
        ));
    }
    out
}
