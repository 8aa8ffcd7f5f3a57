//! Photo upload orchestration
//!
//! validate → derive stored name → resumable transfer → metadata record

mod service;
mod types;

pub use service::PhotoUploadService;
pub use types::{progress_from_snapshot, ProgressSink, UploadOutcome};
