//! Error types for the control layer
use actflow_core::SessionError;
use thiserror::Error;

/// Control layer errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// DMX error
    #[error("DMX error: {0}")]
    DmxError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No act matches the given id or name
    #[error("Act not found: {0}")]
    ActNotFound(String),

    /// Playback session refused the request
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The show runner is no longer accepting commands
    #[error("Show runner has shut down")]
    RunnerClosed,
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
