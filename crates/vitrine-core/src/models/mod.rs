//! Data models for the application
//!
//! Each sub-module represents one feature area: photo uploads, posts, and
//! users (identity plus profile).

mod photo;
mod post;
mod user;

// Re-export all models for convenient imports
pub use photo::*;
pub use post::*;
pub use user::*;
