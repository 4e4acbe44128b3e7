//! Error handling module for checkout-swift.
//!
//! Provides a centralized error type with stable error codes for user-facing
//! diagnostics. No failure here is fatal to the process; callers decide
//! whether to surface or merely log.

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DUPLICATE_PHONE: &str = "DUPLICATE_PHONE";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const AUTH_ERROR: &str = "AUTH_ERROR";
    pub const NO_SESSION: &str = "NO_SESSION";
    pub const REMOTE_ERROR: &str = "REMOTE_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const BAD_DATA: &str = "BAD_DATA";
    pub const LINK_TOO_LONG: &str = "LINK_TOO_LONG";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Input failed validation
    Validation(String),
    /// Phone number already used by another record
    DuplicatePhone(String),
    /// Record not found
    NotFound(String),
    /// Authentication provider rejected the operation
    Auth(String),
    /// A data call was attempted without an active session
    NoSession,
    /// Remote service failure (network, HTTP status, quota)
    Remote(String),
    /// Local key-value store failure
    Storage(String),
    /// Malformed persisted/imported/shared data
    BadData(String),
    /// Serialized share link exceeds the configured maximum
    LinkTooLong { length: usize, max: usize },
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::DuplicatePhone(_) => codes::DUPLICATE_PHONE,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Auth(_) => codes::AUTH_ERROR,
            AppError::NoSession => codes::NO_SESSION,
            AppError::Remote(_) => codes::REMOTE_ERROR,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::BadData(_) => codes::BAD_DATA,
            AppError::LinkTooLong { .. } => codes::LINK_TOO_LONG,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::DuplicatePhone(phone) => {
                format!("Phone number {} already belongs to another record", phone)
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::Auth(msg) => msg.clone(),
            AppError::NoSession => "No active session; sign in first".to_string(),
            AppError::Remote(msg) => msg.clone(),
            AppError::Storage(msg) => msg.clone(),
            AppError::BadData(msg) => msg.clone(),
            AppError::LinkTooLong { length, max } => format!(
                "Share link is {} characters (maximum {}); use file export instead",
                length, max
            ),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("Storage error: {:?}", err);
        AppError::Storage(format!("Storage error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadData(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Remote error: {:?}", err);
        AppError::Remote(format!("Remote error: {}", err))
    }
}
