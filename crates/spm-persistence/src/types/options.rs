//! Save settings.

use serde::{Deserialize, Serialize};

/// File extension of snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "spmdb";

/// Snapshot name used unless another one is chosen.
pub const DEFAULT_FILENAME: &str = "_database.spmdb";

/// How a snapshot is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Target file name inside the browsed directory.
    pub filename: String,

    /// Bundle the loaded-file cache.
    pub include_cache: bool,

    /// Replace an existing file instead of picking `<stem>_1`, `<stem>_2`, ...
    pub overwrite: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            include_cache: false,
            overwrite: false,
        }
    }
}

impl SaveOptions {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_cache(mut self, include_cache: bool) -> Self {
        self.include_cache = include_cache;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}
