//! Error kinds shared by every fallible operation in the pipeline.
//!
//! Mirrors the five failure categories the original system distinguishes
//! (bad arguments, unreadable WAV, corrupt database, query too short,
//! I/O failure) rather than a single opaque error type, so callers can
//! branch on `match` the way `modoIndexar`/`modoBuscar` branch on
//! exception type in spirit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed audio: {0}")]
    MalformedAudio(String),

    #[error("malformed database: {0}")]
    MalformedDatabase(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),
}

impl From<hound::Error> for FingerprintError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => FingerprintError::IoFailure(io),
            other => FingerprintError::MalformedAudio(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
