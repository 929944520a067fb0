//! Persistence error types.
//!
//! Save and load failures carry the path and operation involved, plus a
//! user-facing message and an optional hint.

use std::path::PathBuf;
use thiserror::Error;

/// Snapshot operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory to save into or scan does not exist.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Not a snapshot container (bad magic, too short, wrong marker).
    #[error("Invalid snapshot file format")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Written by a newer container version.
    #[error("Snapshot file version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion {
        found: u32,
        max_supported: u32,
        path: PathBuf,
    },

    #[error("Failed to serialize snapshot")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to deserialize snapshot: {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The temporary file could not be moved onto the target.
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::NotADirectory { path } => {
                format!("{} is not a directory", path.display())
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The file at {} is not a data browser snapshot: {}",
                    path.display(),
                    reason
                )
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
                ..
            } => {
                format!(
                    "This snapshot was written by a newer version of the browser \
                    (file version {}, this version supports up to {}).",
                    found, max_supported
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while writing the database snapshot.".to_string()
            }
            Self::Deserialization { path, .. } => {
                format!(
                    "The snapshot at {} could not be read. The file may be corrupted.",
                    path.display()
                )
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the snapshot to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the file exists and you have permission to read it.".into())
                } else {
                    Some("Check that you have permission to write to this location.".into())
                }
            }
            Self::NotADirectory { .. } => Some("Pass the folder holding the measurement files.".into()),
            Self::InvalidFormat { .. } => Some("Pick a .spmdb snapshot file.".into()),
            Self::UnsupportedVersion { .. } => Some("Update the data browser.".into()),
            Self::Serialization { .. } => None,
            Self::Deserialization { .. } => {
                Some("Open an older snapshot or re-import the directory.".into())
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or try saving to a different location.".into())
            }
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
