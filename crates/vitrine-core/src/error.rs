//! Error types module
//!
//! All fallible operations above the backend crates report an [`AppError`]. Every
//! variant belongs to exactly one [`ErrorKind`] so callers can branch on the kind of
//! failure instead of inspecting message text; the `Display` output of each variant is
//! the user-facing message.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Broad error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; the operation never reached the network.
    Validation,
    /// Network or provider failure while transferring or querying.
    Transport,
    /// Metadata write, update, or delete failure.
    Persistence,
    /// Identity provider failure or missing session.
    Auth,
    /// Configuration or programming error.
    Internal,
}

/// Metadata describing how an error should be presented to a user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation can succeed
    fn is_recoverable(&self) -> bool;

    /// Message safe to show to the user
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

fn round_mib(bytes: &u64) -> u64 {
    ((*bytes as f64) / (1024.0 * 1024.0)).round() as u64
}

fn join_types(types: &[String]) -> String {
    types.join(", ")
}

/// Input rejected before any network call was issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File is too large. Maximum {}MB allowed", round_mib(.max_bytes))]
    FileTooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("File type not allowed. Allowed types: {}", join_types(.allowed))]
    UnsupportedType {
        mime_type: String,
        allowed: Vec<String>,
    },

    #[error("Too many files: {count} selected, at most {max} per upload")]
    TooManyFiles { count: usize, max: usize },

    #[error("{field} is required")]
    RequiredField { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: u64 },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: u64 },

    #[error("Invalid email")]
    InvalidEmail,

    #[error("{field} must be a date in YYYY-MM-DD format")]
    InvalidDate { field: String },

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

/// Identity provider failure categories, translated from provider codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    AccountExistsWithDifferentCredential,
    EmailAlreadyInUse,
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    WeakPassword,
    InvalidCredential,
    UserDisabled,
    TooManyRequests,
    NetworkRequestFailed,
    Unknown,
}

impl AuthErrorKind {
    /// Static lookup from provider error code to kind. Unmapped codes are `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/account-exists-with-different-credential" => {
                AuthErrorKind::AccountExistsWithDifferentCredential
            }
            "auth/email-already-in-use" => AuthErrorKind::EmailAlreadyInUse,
            "auth/invalid-email" => AuthErrorKind::InvalidEmail,
            "auth/user-not-found" => AuthErrorKind::UserNotFound,
            "auth/wrong-password" => AuthErrorKind::WrongPassword,
            "auth/weak-password" => AuthErrorKind::WeakPassword,
            "auth/invalid-credential" => AuthErrorKind::InvalidCredential,
            "auth/user-disabled" => AuthErrorKind::UserDisabled,
            "auth/too-many-requests" => AuthErrorKind::TooManyRequests,
            "auth/network-request-failed" => AuthErrorKind::NetworkRequestFailed,
            _ => AuthErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::AccountExistsWithDifferentCredential => {
                "This account already exists with a different sign-in provider"
            }
            AuthErrorKind::EmailAlreadyInUse => "This email is already in use",
            AuthErrorKind::InvalidEmail => "Invalid email",
            AuthErrorKind::UserNotFound => "User not found",
            AuthErrorKind::WrongPassword => "Wrong password",
            AuthErrorKind::WeakPassword => "The password is too weak",
            AuthErrorKind::InvalidCredential => "Invalid credentials",
            AuthErrorKind::UserDisabled => "User disabled",
            AuthErrorKind::TooManyRequests => "Too many failed attempts",
            AuthErrorKind::NetworkRequestFailed => "Connection error",
            AuthErrorKind::Unknown => "An unexpected error occurred",
        }
    }
}

/// Translated identity provider error; keeps the raw code for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .kind.message())]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub code: String,
}

impl AuthError {
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            kind: AuthErrorKind::from_code(&code),
            code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to upload image: {0}")]
    UploadFailed(String),

    #[error("Failed to save image metadata: {0}")]
    MetadataWriteFailed(String),

    #[error("Failed to load: {0}")]
    QueryFailed(String),

    #[error("Failed to delete: {0}")]
    DeleteFailed(String),

    #[error("Failed to update: {0}")]
    UpdateFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (kind, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (ErrorKind, &'static str, bool, LogLevel) {
    match err {
        AppError::Validation(_) => (
            ErrorKind::Validation,
            "VALIDATION_ERROR",
            false,
            LogLevel::Debug,
        ),
        AppError::UploadFailed(_) => (
            ErrorKind::Transport,
            "UPLOAD_FAILED",
            true,
            LogLevel::Error,
        ),
        AppError::QueryFailed(_) => (
            ErrorKind::Transport,
            "QUERY_FAILED",
            true,
            LogLevel::Error,
        ),
        AppError::MetadataWriteFailed(_) => (
            ErrorKind::Persistence,
            "METADATA_WRITE_FAILED",
            true,
            LogLevel::Error,
        ),
        AppError::DeleteFailed(_) => (
            ErrorKind::Persistence,
            "DELETE_FAILED",
            true,
            LogLevel::Error,
        ),
        AppError::UpdateFailed(_) => (
            ErrorKind::Persistence,
            "UPDATE_FAILED",
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            ErrorKind::Persistence,
            "NOT_FOUND",
            false,
            LogLevel::Debug,
        ),
        AppError::Auth(_) => (ErrorKind::Auth, "AUTH_ERROR", false, LogLevel::Debug),
        AppError::Unauthenticated => (
            ErrorKind::Auth,
            "UNAUTHENTICATED",
            false,
            LogLevel::Debug,
        ),
        AppError::Config(_) => (
            ErrorKind::Internal,
            "CONFIG_ERROR",
            false,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            ErrorKind::Internal,
            "INTERNAL_ERROR",
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        app_error_static_metadata(self).0
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Config(_) | AppError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}
