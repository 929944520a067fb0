//! The serialized payload of a snapshot file.

use serde::{Deserialize, Serialize};
use spm_store::{LoadedCache, PropertyStore};

/// Tag proving a payload is a data browser snapshot.
pub const FORMAT_MARKER: &str = "spm-data-browser-database";

/// Borrowed view written by the saver.
#[derive(Debug, Serialize)]
pub struct SnapshotRef<'a> {
    pub format_marker: &'a str,
    pub property_store: &'a PropertyStore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<&'a LoadedCache>,
}

impl<'a> SnapshotRef<'a> {
    pub fn new(property_store: &'a PropertyStore, cache: Option<&'a LoadedCache>) -> Self {
        Self {
            format_marker: FORMAT_MARKER,
            property_store,
            cache,
        }
    }
}

/// A loaded snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub format_marker: String,
    pub property_store: PropertyStore,
    /// Empty when the snapshot was written without the cache.
    #[serde(default)]
    pub cache: LoadedCache,
}

impl Snapshot {
    pub fn has_valid_marker(&self) -> bool {
        self.format_marker == FORMAT_MARKER
    }
}
