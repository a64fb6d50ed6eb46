//! Error types for gator.

use thiserror::Error;

use crate::scraper::{FetchError, IngestError};

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Wraps errors from whichever sqlx backend is compiled in.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Feed could not be fetched or decoded.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Post ingestion aborted.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Command dispatch or usage error.
    #[error("{0}")]
    Command(String),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
