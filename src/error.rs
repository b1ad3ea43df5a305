//! Error types for the wavsk crate.

use thiserror::Error;

/// Errors that can occur while reading, analysing or writing WAV streams.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WskError {
    /// Malformed RIFF/WAVE container or inconsistent header fields.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// PCM sample width the codec cannot handle.
    #[error("unsupported bit depth: {0} bits per sample")]
    UnsupportedBitDepth(u16),
    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),
    /// Bad command-line or action option.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Reference spectral profile could not be read or written.
    #[error("spectral profile error: {0}")]
    Profile(String),
}

impl From<std::io::Error> for WskError {
    fn from(err: std::io::Error) -> Self {
        WskError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for WskError {
    fn from(err: serde_json::Error) -> Self {
        WskError::Profile(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WskError>;
