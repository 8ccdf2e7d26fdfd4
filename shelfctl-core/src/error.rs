//! Structured error types for shelfctl-core.
//!
//! Library callers get a typed error that keeps the store's failure taxonomy
//! (not found, validation, uniqueness, invalid argument) separate from
//! infrastructure failures. The CLI wraps these in `anyhow` at the boundary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ValidationError;

/// Main error type for record store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record with this id
    #[error("book {id} not found")]
    NotFound { id: i64 },

    /// A field is missing or outside its declared bounds
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A unique field collides with an existing record
    #[error("{field} '{value}' already exists")]
    Uniqueness { field: &'static str, value: String },

    /// A call argument is unusable (e.g. page number below 1)
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// I/O operation on the backing file failed
    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// The backing CSV file could not be read or written
    #[error("CSV error in {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    /// The relational backend failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store configuration is unusable
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for record store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a not-found error
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    /// Create a uniqueness error
    pub fn uniqueness(field: &'static str, value: impl Into<String>) -> Self {
        Self::Uniqueness {
            field,
            value: value.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Create an I/O error tagged with the file it happened on
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a CSV error tagged with the file it happened on
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True for the "record does not exist" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
