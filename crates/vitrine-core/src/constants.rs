//! Collection names, storage prefixes, and upload defaults.

/// Document collection holding one record per uploaded photo.
pub const PHOTO_UPLOADS_COLLECTION: &str = "photoUploads";

/// Document collection holding user profiles, keyed by uid.
pub const USERS_COLLECTION: &str = "users";

/// Document collection holding text posts.
pub const POSTS_COLLECTION: &str = "posts";

/// Key prefix under which photo blobs are stored.
pub const DEFAULT_STORAGE_PREFIX: &str = "photos";

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/gif"];

pub const DEFAULT_MAX_FILES_PER_BATCH: usize = 10;

/// Size of the slices a resumable transfer reports progress for.
pub const DEFAULT_TRANSFER_CHUNK_SIZE: usize = 256 * 1024;

/// Display name used when the identity provider has none.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

pub const POST_TITLE_MAX_LENGTH: u64 = 100;
pub const POST_CONTENT_MAX_LENGTH: u64 = 1000;
pub const PASSWORD_MIN_LENGTH: usize = 6;
