//! Error types for show file I/O

use actflow_control::ControlError;

/// Result type alias for show file operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised while reading or writing show files.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON parsing failed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// File extension is neither RON nor JSON
    #[error("Unsupported show file format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the size limit
    #[error("Show file is {size} bytes, limit is {limit}")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Allowed size in bytes
        limit: u64,
    },

    /// File was written by an incompatible version
    #[error("Show file version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads
        expected: String,
        /// Version stored in the file
        found: String,
    },

    /// The fixture patch in the file is inconsistent
    #[error("Invalid fixture patch: {0}")]
    Patch(#[from] ControlError),
}
