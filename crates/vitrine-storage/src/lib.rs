//! Vitrine Storage Library
//!
//! Blob storage abstraction used by the upload pipeline. A [`BlobStore`] receives the
//! bytes of one photo under a storage key, reports transfer progress chunk by chunk,
//! and hands back a download URI.
//!
//! # Storage key format
//!
//! Keys are `{prefix}/{stored_name}`, with prefix `photos` unless configured
//! otherwise. Keys must not contain `..` or a leading `/`. Key generation lives in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
pub mod transfer;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{build_storage_key, validate_storage_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{
    BlobStore, ProgressCallback, StorageError, StorageResult, StoredObject, TransferSnapshot,
    TransferState,
};
pub use vitrine_core::StorageBackend;
