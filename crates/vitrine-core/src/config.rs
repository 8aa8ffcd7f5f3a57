//! Configuration module
//!
//! Runtime settings are read from the process environment (after loading a `.env`
//! file when present). Every setting has a default so a bare checkout runs against
//! the local blob store and the in-memory document store.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_FILES_PER_BATCH, DEFAULT_STORAGE_PREFIX,
    DEFAULT_TRANSFER_CHUNK_SIZE,
};
use crate::storage_types::{DocumentBackend, StorageBackend};
use crate::validation::ValidationPolicy;

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 5;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/blobs";
const DEFAULT_LOCAL_STORAGE_BASE_URL: &str = "http://localhost:8080/files";

/// Log output format for the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub local_storage_path: PathBuf,
    pub local_storage_base_url: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_endpoint: Option<String>,

    pub document_backend: DocumentBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,

    pub max_file_size_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub max_files_per_batch: usize,
    pub storage_prefix: String,
    pub chunk_size_bytes: usize,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Local,
            local_storage_path: PathBuf::from(DEFAULT_LOCAL_STORAGE_PATH),
            local_storage_base_url: DEFAULT_LOCAL_STORAGE_BASE_URL.to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            document_backend: DocumentBackend::Memory,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_files_per_batch: DEFAULT_MAX_FILES_PER_BATCH,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            chunk_size_bytes: DEFAULT_TRANSFER_CHUNK_SIZE,
            log_format: LogFormat::Compact,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse::<StorageBackend>()?,
            Err(_) => defaults.storage_backend,
        };

        let document_backend = match env::var("DOCUMENT_STORE") {
            Ok(raw) => raw.parse::<DocumentBackend>()?,
            Err(_) => defaults.document_backend,
        };

        let max_file_size_mb = env::var("UPLOAD_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("UPLOAD_MAX_FILE_SIZE_MB must be a valid number"))?;

        let chunk_size_kb = env::var("UPLOAD_CHUNK_SIZE_KB")
            .unwrap_or_else(|_| (DEFAULT_TRANSFER_CHUNK_SIZE / 1024).to_string())
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("UPLOAD_CHUNK_SIZE_KB must be a valid number"))?;

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        let config = Config {
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_storage_path),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or(defaults.local_storage_base_url),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            document_backend,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_content_types: env::var("UPLOAD_ALLOWED_CONTENT_TYPES")
                .map(|raw| parse_list(&raw))
                .unwrap_or(defaults.allowed_content_types),
            max_files_per_batch: env::var("UPLOAD_MAX_FILES_PER_BATCH")
                .unwrap_or_else(|_| DEFAULT_MAX_FILES_PER_BATCH.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILES_PER_BATCH),
            storage_prefix: env::var("UPLOAD_STORAGE_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(defaults.storage_prefix),
            chunk_size_bytes: chunk_size_kb * 1024,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.as_deref().map_or(true, str::is_empty) {
                    anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
                }
                if self.s3_region.is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3");
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.as_os_str().is_empty() {
                    anyhow::bail!("LOCAL_STORAGE_PATH must not be empty");
                }
            }
            StorageBackend::Memory => {}
        }

        if self.document_backend == DocumentBackend::Postgres
            && self.database_url.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("DATABASE_URL must be set when DOCUMENT_STORE=postgres");
        }

        if self.max_file_size_bytes == 0 {
            anyhow::bail!("UPLOAD_MAX_FILE_SIZE_MB must be greater than 0");
        }
        if self.allowed_content_types.is_empty() {
            anyhow::bail!("UPLOAD_ALLOWED_CONTENT_TYPES must list at least one type");
        }
        if self.max_files_per_batch == 0 {
            anyhow::bail!("UPLOAD_MAX_FILES_PER_BATCH must be greater than 0");
        }
        if self.chunk_size_bytes == 0 {
            anyhow::bail!("UPLOAD_CHUNK_SIZE_KB must be greater than 0");
        }
        if self.storage_prefix.is_empty() || self.storage_prefix.contains("..") {
            anyhow::bail!("UPLOAD_STORAGE_PREFIX must be a non-empty relative prefix");
        }

        Ok(())
    }

    /// Upload policy derived from the configured limits.
    pub fn upload_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            max_size_bytes: self.max_file_size_bytes,
            allowed_mime_types: self.allowed_content_types.clone(),
            max_files_per_batch: self.max_files_per_batch,
        }
    }
}
