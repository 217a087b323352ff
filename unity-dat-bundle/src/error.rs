//! Error types for UnityFS parsing

use thiserror::Error;
use unity_dat_core::{LoadError, ReadError};

/// Result type for container parsing
pub type Result<T> = std::result::Result<T, BinaryError>;

/// Errors that can occur while parsing a bundle or one of its objects
#[derive(Error, Debug)]
pub enum BinaryError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid signature
    #[error("Invalid signature: expected {expected}, got {actual}")]
    InvalidSignature { expected: String, actual: String },

    /// Not enough data
    #[error("Not enough data: expected {expected}, got {actual}")]
    NotEnoughData { expected: usize, actual: usize },

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Decompression failed
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// String bytes were not UTF-8
    #[error("Invalid UTF-8 string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl BinaryError {
    /// Create a not enough data error
    pub fn not_enough_data(expected: usize, actual: usize) -> Self {
        Self::NotEnoughData { expected, actual }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a decompression error
    pub fn decompression_failed<S: Into<String>>(msg: S) -> Self {
        Self::DecompressionFailed(msg.into())
    }

    /// Create an unsupported feature error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }
}

impl From<BinaryError> for LoadError {
    fn from(err: BinaryError) -> Self {
        match err {
            BinaryError::Io(e) => LoadError::Io(e),
            BinaryError::InvalidSignature { expected, actual } => {
                LoadError::invalid_signature(expected, actual)
            }
            other => LoadError::parse(other.to_string()),
        }
    }
}

impl From<BinaryError> for ReadError {
    fn from(err: BinaryError) -> Self {
        match err {
            BinaryError::Unsupported(msg) => ReadError::Unsupported(msg),
            other => ReadError::corrupted(other.to_string()),
        }
    }
}
