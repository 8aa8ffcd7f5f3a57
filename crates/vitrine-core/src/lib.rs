//! Vitrine Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and
//! validation rules shared by every Vitrine component: the storage and
//! document backends, the service layer, and the client state holders.

pub mod config;
pub mod constants;
pub mod error;
pub mod format;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{
    AppError, AuthError, AuthErrorKind, ErrorKind, ErrorMetadata, LogLevel, ValidationError,
};
pub use format::format_file_size;
pub use storage_types::{DocumentBackend, StorageBackend};
pub use validation::ValidationPolicy;
