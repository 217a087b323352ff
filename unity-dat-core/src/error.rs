//! Error types for the decrypt and export pipelines

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unity-dat operations
pub type Result<T> = std::result::Result<T, DatError>;

/// Session-establishing failures
///
/// These abort a whole request (decrypt, bulk export, listing). Per-object
/// problems never show up here; they are [`ReadError`]s collected by the
/// exporter.
#[derive(Error, Debug)]
pub enum DatError {
    /// IO errors when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No single-byte key reproduces the signature prefix
    #[error("XOR key not found for {signature_len}-byte signature")]
    KeyNotFound { signature_len: usize },

    /// The bundle reader rejected the bundle
    #[error("Bundle load failed: {0}")]
    Load(#[from] LoadError),

    /// Export directory could not be created
    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid or unreadable options
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the current session state
    #[error("Session error: {0}")]
    Session(String),
}

impl DatError {
    /// Create a key-not-found error
    pub fn key_not_found(signature_len: usize) -> Self {
        Self::KeyNotFound { signature_len }
    }

    /// Create an output directory error
    pub fn output_directory<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::OutputDirectory {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a session state error
    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session(message.into())
    }
}

/// Errors raised by a bundle reader while loading a whole bundle
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid signature
    #[error("Invalid signature: expected {expected}, got {actual}")]
    InvalidSignature { expected: String, actual: String },

    /// The reader does not know these bytes
    #[error("Unknown bundle ({size} bytes)")]
    UnknownBundle { size: usize },

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LoadError {
    /// Create a new invalid signature error
    pub fn invalid_signature<S: Into<String>>(expected: S, actual: S) -> Self {
        Self::InvalidSignature {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }
}

/// Errors raised by a bundle reader for a single object
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The object's payload kind cannot be decoded by the reader
    #[error("Unsupported payload: {0}")]
    Unsupported(String),

    /// Payload bytes are damaged
    #[error("Corrupted data detected: {0}")]
    Corrupted(String),

    /// Payload lives in a resource that is not part of the bundle
    #[error("Missing resource: {0}")]
    MissingResource(String),
}

impl ReadError {
    /// Create an unsupported payload error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a corrupted data error
    pub fn corrupted<S: Into<String>>(msg: S) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Create a missing resource error
    pub fn missing_resource<S: Into<String>>(msg: S) -> Self {
        Self::MissingResource(msg.into())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Skip the object and continue
    Low,
    /// Should be logged
    Medium,
    /// Operation cannot continue
    Critical,
}

impl DatError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DatError::Io(_) => ErrorSeverity::Critical,
            DatError::KeyNotFound { .. } => ErrorSeverity::Critical,
            DatError::Load(_) => ErrorSeverity::Critical,
            DatError::OutputDirectory { .. } => ErrorSeverity::Critical,
            DatError::Config(_) => ErrorSeverity::Medium,
            DatError::Session(_) => ErrorSeverity::Medium,
        }
    }
}

impl ReadError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadError::Unsupported(_) => ErrorSeverity::Low,
            ReadError::Corrupted(_) => ErrorSeverity::Medium,
            ReadError::MissingResource(_) => ErrorSeverity::Medium,
        }
    }
}
