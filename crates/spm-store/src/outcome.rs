//! Results of store writes.

use spm_model::Layer;
use thiserror::Error;

/// Flags that widen what a write may create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteMode {
    /// Create the record for the scope's id. Only `stitch` records are
    /// created this way; per-file records come from
    /// [`PropertyStore::add_record`](crate::PropertyStore::add_record), and
    /// the flag is ignored for `super` and `link`.
    pub create_id: bool,
    /// Create the key when the record does not have it yet.
    pub create_key: bool,
}

impl WriteMode {
    /// Overwrite an existing key only.
    pub const UPDATE: WriteMode = WriteMode {
        create_id: false,
        create_key: false,
    };
    /// Overwrite or add a key on an existing record.
    pub const CREATE_KEY: WriteMode = WriteMode {
        create_id: false,
        create_key: true,
    };
    /// Start a new record with its first key.
    pub const CREATE_RECORD: WriteMode = WriteMode {
        create_id: true,
        create_key: true,
    };
}

/// Why a write was refused. A refused write leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("no record '{id}' in {layer}")]
    UnknownId { layer: Layer, id: String },

    #[error("no property '{key}' in {scope}")]
    UnknownKey { scope: String, key: String },

    #[error("record '{id}' already exists in {layer}")]
    DuplicateId { layer: Layer, id: String },

    #[error("per-file record '{0}' can only be created from a file fingerprint")]
    NeedsFingerprint(String),
}

/// What a write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new key (and possibly a new record) was added.
    Created,
    /// An existing key was overwritten.
    Updated,
    Refused(Refusal),
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, WriteOutcome::Refused(_))
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            WriteOutcome::Refused(refusal) => Some(refusal),
            _ => None,
        }
    }
}
