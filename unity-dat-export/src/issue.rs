//! Per-object export issues
//!
//! Every object that does not end up as a file gets exactly one issue. Some
//! issues are plain skips (nothing to export), the rest are failures.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use unity_dat_core::{ErrorSeverity, ReadError};

/// Why an object produced no file
#[derive(Error, Debug)]
pub enum ExportIssue {
    /// The reader could not decode the payload
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    /// Payload carries no data
    #[error("empty payload")]
    EmptyPayload,

    /// Payload variant does not fit the type tag
    #[error("{type_tag} expects {expected} payload, got {found}")]
    UnexpectedPayload {
        type_tag: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Resolved name would leave the output directory
    #[error("unsafe output name: {0}")]
    UnsafeName(String),

    /// Payload could not be encoded to the export format
    #[error("encode failed: {0}")]
    Encode(String),

    /// The file could not be written
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExportIssue {
    /// Create an encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Skips mean "nothing to export"; everything else is a failure
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            ExportIssue::EmptyPayload | ExportIssue::UnexpectedPayload { .. }
        )
    }

    /// Get issue severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportIssue::Read(e) => e.severity(),
            ExportIssue::EmptyPayload => ErrorSeverity::Low,
            ExportIssue::UnexpectedPayload { .. } => ErrorSeverity::Low,
            ExportIssue::UnsafeName(_) => ErrorSeverity::Medium,
            ExportIssue::Encode(_) => ErrorSeverity::Medium,
            ExportIssue::Io { .. } => ErrorSeverity::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_vs_failure() {
        assert!(!ExportIssue::EmptyPayload.is_failure());
        assert!(
            !ExportIssue::UnexpectedPayload {
                type_tag: "Texture2D".to_string(),
                expected: "image",
                found: "raw bytes",
            }
            .is_failure()
        );
        assert!(ExportIssue::from(ReadError::corrupted("bad block")).is_failure());
        assert!(ExportIssue::encode("zero size").is_failure());
    }

    #[test]
    fn test_display() {
        let issue = ExportIssue::UnexpectedPayload {
            type_tag: "AudioClip".to_string(),
            expected: "raw bytes",
            found: "image",
        };
        assert_eq!(issue.to_string(), "AudioClip expects raw bytes payload, got image");
    }
}
