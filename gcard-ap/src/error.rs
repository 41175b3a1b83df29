//! Error types for gcard-ap
//!
//! Module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for gcard-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Media playback errors (play rejected, track unusable)
    #[error("Playback error: {0}")]
    Playback(String),

    /// Resource not found (unknown portrait, missing asset)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the common library
    #[error(transparent)]
    Common(#[from] gcard_common::Error),
}

/// Convenience Result type using gcard-ap Error
pub type Result<T> = std::result::Result<T, Error>;
