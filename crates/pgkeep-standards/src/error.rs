use pgkeep_core::PgKeepError;
use thiserror::Error;

/// Errors raised by the standards engine
#[derive(Debug, Error)]
pub enum StandardsError {
    /// Catalog or statement failure from the database layer
    #[error(transparent)]
    Database(#[from] PgKeepError),

    /// A validation rule could not be compiled
    #[error("invalid validation rule '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// Settings could not be read or contain bad values
    #[error("settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StandardsResult<T> = Result<T, StandardsError>;
