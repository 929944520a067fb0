//! Error types for the database manager.

use std::path::PathBuf;

use spm_ingest::{IngestError, LoadError};
use spm_model::DataId;
use spm_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to load {id}")]
    Load {
        id: DataId,
        #[source]
        source: LoadError,
    },

    #[error("no record named {0}")]
    UnknownRecord(String),

    /// The record's extension matches neither viewer.
    #[error("no viewer for {0}")]
    NoViewer(String),

    #[error("the database holds no records")]
    EmptyDatabase,

    #[error("failed to write {path}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn the refresh thread")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
