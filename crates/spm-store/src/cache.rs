//! Parsed file content kept alongside the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spm_model::{DataId, LoadedFile};

/// Loaded files keyed by record id.
///
/// Filled lazily on first access and never evicted. Snapshots leave it out
/// unless asked to include it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadedCache {
    files: BTreeMap<DataId, LoadedFile>,
}

impl LoadedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&LoadedFile> {
        self.files.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.files.contains_key(id)
    }

    pub fn insert(&mut self, id: DataId, file: LoadedFile) {
        self.files.insert(id, file);
    }

    /// Adds entries from `other` that are not present yet.
    pub fn merge_missing(&mut self, other: LoadedCache) {
        for (id, file) in other.files {
            self.files.entry(id).or_insert(file);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &DataId> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
