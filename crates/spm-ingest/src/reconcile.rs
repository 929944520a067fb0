//! Comparison of recorded fingerprints against a fresh directory index.

use std::collections::HashMap;

use spm_model::{DataId, FileFingerprint};
use tracing::{debug, warn};

/// Outcome of comparing the recorded fingerprints with a fresh index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub has_new_elements: bool,
    pub is_incompatible: bool,
    /// Untracked files in index order. Always empty when incompatible.
    pub new_elements: Vec<FileFingerprint>,
}

impl Reconciliation {
    fn incompatible() -> Self {
        Self {
            has_new_elements: false,
            is_incompatible: true,
            new_elements: Vec::new(),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        !self.has_new_elements && !self.is_incompatible
    }

    pub fn new_ids(&self) -> Vec<DataId> {
        self.new_elements
            .iter()
            .map(|fp| fp.filename.clone())
            .collect()
    }
}

/// Classifies `new` against `old`.
///
/// A tracked file whose size or modified time differs makes the whole result
/// incompatible, and nothing found before it is kept. Files present only in
/// `old` are ignored.
pub fn reconcile(old: &[FileFingerprint], new: &[FileFingerprint]) -> Reconciliation {
    let recorded: HashMap<&DataId, &FileFingerprint> =
        old.iter().map(|fp| (&fp.filename, fp)).collect();

    let mut new_elements = Vec::new();
    for fingerprint in new {
        match recorded.get(&fingerprint.filename) {
            Some(previous) if previous.same_content(fingerprint) => {}
            Some(previous) => {
                warn!(
                    data_id = %fingerprint.filename,
                    recorded_size = previous.size,
                    found_size = fingerprint.size,
                    recorded_modified = %previous.modified,
                    found_modified = %fingerprint.modified,
                    "fingerprint changed for tracked file"
                );
                return Reconciliation::incompatible();
            }
            None => {
                debug!(data_id = %fingerprint.filename, "new file found");
                new_elements.push(fingerprint.clone());
            }
        }
    }

    Reconciliation {
        has_new_elements: !new_elements.is_empty(),
        is_incompatible: false,
        new_elements,
    }
}
