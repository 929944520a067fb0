//! Error types for directory indexing and file loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while indexing a measurement directory.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Directory not found or not a directory.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to stat a file.
    #[error("failed to read metadata of {path}: {source}")]
    FileMetadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for indexing operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors raised by a data loader for a single file.
///
/// Callers report these per record and carry on with the batch.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a scan or spectrum file")]
    UnsupportedKind { path: PathBuf },

    /// The file ended before the data block.
    #[error("no data section found in {path}")]
    MissingDataSection { path: PathBuf },

    #[error("malformed file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl LoadError {
    pub(crate) fn malformed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
