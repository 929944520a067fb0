//! File fingerprints used to detect new and altered measurement files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DataId, PropValue};

/// Per-file property keys written before anything else for a new record.
pub const META_KEYS: [&str; 4] = [
    FileFingerprint::KEY_FILENAME,
    FileFingerprint::KEY_EXTENSION,
    FileFingerprint::KEY_SIZE,
    FileFingerprint::KEY_MODIFIED,
];

/// Identity plus `(size, modified time)` of one measurement file.
///
/// Only size and modified time take part in change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub filename: DataId,
    pub extension: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileFingerprint {
    pub const KEY_FILENAME: &'static str = "filename_full";
    pub const KEY_EXTENSION: &'static str = "filename_ending";
    pub const KEY_SIZE: &'static str = "file_size";
    pub const KEY_MODIFIED: &'static str = "file_modified_date";

    pub fn new(filename: DataId, size: u64, modified: DateTime<Utc>) -> Self {
        let extension = filename.extension().to_string();
        Self {
            filename,
            extension,
            size,
            modified,
        }
    }

    /// True when size and modified time agree.
    pub fn same_content(&self, other: &FileFingerprint) -> bool {
        self.size == other.size && self.modified == other.modified
    }

    /// The four meta properties in [`META_KEYS`] order.
    pub fn to_props(&self) -> [(&'static str, PropValue); 4] {
        [
            (Self::KEY_FILENAME, PropValue::from(self.filename.as_str())),
            (Self::KEY_EXTENSION, PropValue::from(self.extension.as_str())),
            (Self::KEY_SIZE, PropValue::from(self.size)),
            (Self::KEY_MODIFIED, PropValue::from(self.modified)),
        ]
    }

    /// Rebuilds a fingerprint from stored meta properties.
    ///
    /// `lookup` returns the stored value for a meta key. Any missing or
    /// mistyped value yields `None`.
    pub fn from_props<'a, F>(id: &DataId, mut lookup: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<&'a PropValue>,
    {
        let extension = lookup(Self::KEY_EXTENSION)?.as_str()?.to_string();
        let size = u64::try_from(lookup(Self::KEY_SIZE)?.as_i64()?).ok()?;
        let modified = lookup(Self::KEY_MODIFIED)?.as_time()?;
        Some(Self {
            filename: id.clone(),
            extension,
            size,
            modified,
        })
    }
}
