//! Error types for XRM/TXRM operations

use thiserror::Error;

/// Main error type for XRM/TXRM reads
#[derive(Error, Debug)]
pub enum XrmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a compound-file container: {0}")]
    NotAContainer(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed record {path}: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unsupported pixel format code: {0}")]
    UnsupportedPixelFormat(u32),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Specialized Result type for XRM/TXRM operations
pub type Result<T> = std::result::Result<T, XrmError>;

impl From<serde_json::Error> for XrmError {
    fn from(err: serde_json::Error) -> Self {
        XrmError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for XrmError {
    fn from(err: tokio::task::JoinError) -> Self {
        XrmError::Task(err.to_string())
    }
}
