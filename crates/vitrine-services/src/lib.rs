//! Vitrine Services Layer
//!
//! Business services sitting between the client state holders and the backends:
//! the photo upload orchestrator, posts, user profiles, and authentication. Every
//! service receives its backends explicitly (`Arc<dyn BlobStore>`,
//! `Arc<dyn DocumentStore>`, `Arc<dyn IdentityProvider>`), so tests substitute the
//! in-memory implementations.

pub mod auth;
mod errors;
pub mod posts;
pub mod profiles;
pub mod setup;
pub mod uploads;

pub use auth::{AuthService, IdentityProvider, MemoryIdentityProvider, ProviderError};
pub use posts::PostService;
pub use profiles::UserProfileService;
pub use setup::{Backends, Services};
pub use uploads::{PhotoUploadService, ProgressSink, UploadOutcome};

pub use vitrine_db::{DocumentStore, MemoryDocumentStore, StoreOperation};
pub use vitrine_storage::{BlobStore, MemoryStorage};
