//! Vitrine Client State
//!
//! Explicit state holders for the views: each one owns a `tokio::sync::watch`
//! channel carrying a snapshot of its state. Views call [`watch::Receiver::changed`]
//! on a subscription to re-render, and drive loading explicitly through `load()`.
//!
//! [`watch::Receiver::changed`]: tokio::sync::watch::Receiver::changed

pub mod auth;
pub mod gallery;
pub mod photos;
pub mod posts;
pub mod profile;

pub use auth::{AuthSession, AuthSnapshot};
pub use gallery::{EditDraft, GalleryView, ViewMode};
pub use photos::{PhotoUploads, UploadSnapshot};
pub use posts::{PostsSnapshot, PostsState};
pub use profile::{ProfileSnapshot, ProfileState};
