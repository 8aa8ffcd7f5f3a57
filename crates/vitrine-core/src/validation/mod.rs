//! Validation modules
//!
//! `upload` holds the per-file policy applied before any transfer starts and the
//! stored-name derivation; `forms` validates credentials, posts, and profiles.

pub mod forms;
pub mod upload;

pub use forms::{
    calculate_age, parse_birth_date, validate_credentials, validate_email, validate_form,
};
pub use upload::{
    derive_stored_name, derive_stored_name_at, next_timestamp_millis, sanitize_base_name,
    split_extension, ValidationPolicy,
};
