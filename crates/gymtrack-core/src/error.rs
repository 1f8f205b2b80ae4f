//! Core error types for gymtrack-core.
//!
//! One thiserror enum per concern (store, configuration, validation),
//! aggregated into [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for gymtrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Member store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A precondition of the status engine was violated.
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: &'static str, message: String },

    /// No signed-in owner, so there is no member collection to read.
    #[error("Not authenticated: no owner account is configured")]
    Unauthenticated,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Member store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open member store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The store could not serve the request.
    #[error("Member store unavailable: {0}")]
    Unavailable(String),

    /// Database is locked
    #[error("Member store is locked")]
    Locked,

    /// Migration failed
    #[error("Member store migration failed: {0}")]
    MigrationFailed(String),

    /// No member with that id for the owner.
    #[error("Member not found: {id}")]
    NotFound { id: String },

    /// A write would store a record that breaks the member schema.
    #[error("Member {id} rejected: {message}")]
    Rejected { id: String, message: String },

    /// A stored row does not match the member schema.
    #[error("Member {id} has invalid stored data: {message}")]
    Corrupt { id: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Input validation errors, raised before anything reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty after trimming
    #[error("'{field}' is required")]
    EmptyField { field: &'static str },

    /// Field contains characters outside its allowed class
    #[error("'{field}' may only contain {allowed}")]
    InvalidCharacters {
        field: &'static str,
        allowed: &'static str,
    },

    /// Field exceeds its maximum length
    #[error("'{field}' must be at most {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    /// Phone number has fewer digits than required
    #[error("phone must have at least {min} digits (got {len})")]
    PhoneTooShort { min: usize, len: usize },

    /// Email address is not well-formed
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::Unavailable(err.to_string())
                }
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

impl CoreError {
    pub(crate) fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::InvalidArgument {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
