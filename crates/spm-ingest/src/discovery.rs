//! Measurement file discovery for a browsed directory.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use spm_model::{DataId, FileFingerprint, FileKind};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Fingerprints every scan and spectrum file in `dir`, newest first.
///
/// Files are ordered by creation time, falling back to modification time on
/// filesystems that do not record it; ties are broken by name. Only
/// directory listings and metadata calls are made, file contents are never
/// opened. Other extensions and subdirectories are skipped.
pub fn index_directory(dir: &Path) -> Result<Vec<FileFingerprint>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut found: Vec<(SystemTime, FileFingerprint)> = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(id) = DataId::new(name) else {
            continue;
        };
        if id.kind().is_none() {
            continue;
        }

        let metadata = entry.metadata().map_err(|e| IngestError::FileMetadata {
            path: path.clone(),
            source: e,
        })?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().map_err(|e| IngestError::FileMetadata {
            path: path.clone(),
            source: e,
        })?;
        let created = metadata.created().unwrap_or(modified);

        found.push((
            created,
            FileFingerprint::new(id, metadata.len(), DateTime::<Utc>::from(modified)),
        ));
    }

    found.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| a.1.filename.cmp(&b.1.filename))
    });
    debug!(dir = %dir.display(), files = found.len(), "indexed directory");

    Ok(found.into_iter().map(|(_, fingerprint)| fingerprint).collect())
}

/// Warns about filenames with more than one `.`; they are still tracked.
///
/// Returns the offending ids.
pub fn check_filenames(fingerprints: &[FileFingerprint]) -> Vec<DataId> {
    fingerprints
        .iter()
        .filter(|fp| fp.filename.has_multiple_dots())
        .map(|fp| {
            warn!(data_id = %fp.filename, "more than one '.' in filename");
            fp.filename.clone()
        })
        .collect()
}

/// Number of indexed files per kind.
pub fn count_by_kind(fingerprints: &[FileFingerprint], kind: FileKind) -> usize {
    fingerprints
        .iter()
        .filter(|fp| fp.filename.kind() == Some(kind))
        .count()
}
