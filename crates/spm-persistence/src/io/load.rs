//! Snapshot loading.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{PersistenceError, Result};
use crate::types::{CURRENT_SCHEMA_VERSION, FORMAT_MARKER, HEADER_LEN, MAGIC_BYTES, Snapshot};

/// Load `filename` from `directory`.
pub fn load_snapshot(directory: &Path, filename: &str) -> Result<Snapshot> {
    load_snapshot_file(&directory.join(filename))
}

/// Load a snapshot file.
///
/// A snapshot saved without the cache comes back with an empty one.
pub fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io("read", path, e))?;
    let snapshot = parse_snapshot_bytes(&bytes, path)?;
    info!(
        path = %path.display(),
        records = snapshot.property_store.len(),
        cached = snapshot.cache.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

/// Validate the container header and return the payload.
pub(crate) fn payload<'a>(bytes: &'a [u8], path: &Path) -> Result<&'a [u8]> {
    if bytes.len() < HEADER_LEN {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "File too small".to_string(),
        });
    }

    if bytes[0..4] != MAGIC_BYTES {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: "Not a snapshot file (invalid magic bytes)".to_string(),
        });
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version > CURRENT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: version,
            max_supported: CURRENT_SCHEMA_VERSION,
            path: path.to_path_buf(),
        });
    }

    Ok(&bytes[HEADER_LEN..])
}

fn parse_snapshot_bytes(bytes: &[u8], path: &Path) -> Result<Snapshot> {
    let payload = payload(bytes, path)?;
    let snapshot: Snapshot =
        serde_json::from_slice(payload).map_err(|source| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source,
        })?;

    if !snapshot.has_valid_marker() {
        return Err(PersistenceError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!(
                "format marker is {:?}, expected {:?}",
                snapshot.format_marker, FORMAT_MARKER
            ),
        });
    }
    Ok(snapshot)
}
