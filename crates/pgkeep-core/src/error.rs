//! Error types for pgkeep

use thiserror::Error;

/// Core error type for pgkeep operations
#[derive(Error, Debug)]
pub enum PgKeepError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    /// The statement tried to create an object that already exists (SQLSTATE 42710).
    #[error("Object already exists: {0}")]
    DuplicateObject(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A packaged SQL script could not be located. Indicates a broken installation.
    #[error("SQL file not found: {0}")]
    MissingAsset(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PgKeepError {
    /// Whether this error is the "already exists" outcome of a racing create.
    pub fn is_duplicate_object(&self) -> bool {
        matches!(self, PgKeepError::DuplicateObject(_))
    }
}

/// Result type alias for pgkeep operations
pub type Result<T> = std::result::Result<T, PgKeepError>;
