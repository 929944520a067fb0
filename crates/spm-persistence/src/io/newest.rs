//! Finding the most recently saved snapshot of a directory.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use spm_model::PropValue;
use spm_store::Record;
use spm_store::keys::super_keys;
use tracing::{debug, warn};

use super::load::payload;
use crate::error::{PersistenceError, Result};
use crate::types::{FORMAT_MARKER, SNAPSHOT_EXTENSION};

/// Just enough of a snapshot to read its save time.
#[derive(Deserialize)]
struct SaveStamp {
    format_marker: String,
    property_store: StampStore,
}

#[derive(Deserialize)]
struct StampStore {
    #[serde(rename = "super", default)]
    super_props: Record,
}

/// Names of the files in `directory` carrying the snapshot extension,
/// sorted by name.
pub fn snapshot_files(directory: &Path) -> Result<Vec<String>> {
    if !directory.is_dir() {
        return Err(PersistenceError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }
    let entries =
        fs::read_dir(directory).map_err(|e| PersistenceError::io("read", directory, e))?;

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext == SNAPSHOT_EXTENSION)
        })
        .collect();
    names.sort();
    Ok(names)
}

/// The snapshot in `directory` with the latest `db_save_time`.
///
/// Files that are not readable snapshots, or that lack a save time, are
/// skipped with a warning. `None` when nothing qualifies.
pub fn find_newest(directory: &Path) -> Result<Option<String>> {
    let mut newest: Option<(DateTime<Utc>, String)> = None;
    for name in snapshot_files(directory)? {
        let Some(saved_at) = save_time(&directory.join(&name)) else {
            continue;
        };
        debug!(snapshot = %name, %saved_at, "snapshot candidate");
        if newest.as_ref().is_none_or(|(best, _)| saved_at > *best) {
            newest = Some((saved_at, name));
        }
    }
    Ok(newest.map(|(_, name)| name))
}

fn save_time(path: &Path) -> Option<DateTime<Utc>> {
    let stamp = fs::read(path)
        .map_err(|e| PersistenceError::io("read", path, e))
        .and_then(|bytes| {
            let payload = payload(&bytes, path)?;
            serde_json::from_slice::<SaveStamp>(payload).map_err(|source| {
                PersistenceError::Deserialization {
                    path: path.to_path_buf(),
                    source,
                }
            })
        });
    let stamp = match stamp {
        Ok(stamp) if stamp.format_marker == FORMAT_MARKER => stamp,
        Ok(_) => {
            warn!(path = %path.display(), "skipping file with a foreign format marker");
            return None;
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable snapshot");
            return None;
        }
    };
    let saved_at = stamp
        .property_store
        .super_props
        .get(super_keys::DB_SAVE_TIME)
        .and_then(PropValue::as_time);
    if saved_at.is_none() {
        warn!(
            path = %path.display(),
            "snapshot has no db_save_time; it was probably saved before its super properties existed"
        );
    }
    saved_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::save::{encode_snapshot, write_atomic};
    use crate::types::SnapshotRef;
    use chrono::TimeZone;
    use spm_store::{PropertyStore, WriteMode};
    use tempfile::tempdir;

    fn write_with_time(directory: &Path, name: &str, secs: Option<i64>) {
        let mut store = PropertyStore::new();
        if let Some(secs) = secs {
            store.write_super(
                super_keys::DB_SAVE_TIME,
                Utc.timestamp_opt(secs, 0).unwrap(),
                WriteMode::CREATE_KEY,
            );
        }
        let bytes = encode_snapshot(&SnapshotRef::new(&store, None)).unwrap();
        write_atomic(&directory.join(name), &bytes).unwrap();
    }

    #[test]
    fn test_newest_by_save_time_not_name() {
        let dir = tempdir().unwrap();
        write_with_time(dir.path(), "_database.spmdb", Some(3000));
        write_with_time(dir.path(), "_database_1.spmdb", Some(1000));
        write_with_time(dir.path(), "_database_2.spmdb", None);
        fs::write(dir.path().join("junk.spmdb"), b"garbage").unwrap();
        fs::write(dir.path().join("a.sxm"), b"").unwrap();

        assert_eq!(
            snapshot_files(dir.path()).unwrap(),
            vec!["_database.spmdb", "_database_1.spmdb", "_database_2.spmdb", "junk.spmdb"]
        );
        assert_eq!(find_newest(dir.path()).unwrap().as_deref(), Some("_database.spmdb"));
    }

    #[test]
    fn test_no_qualifying_snapshot() {
        let dir = tempdir().unwrap();
        assert_eq!(find_newest(dir.path()).unwrap(), None);
        write_with_time(dir.path(), "_database.spmdb", None);
        assert_eq!(find_newest(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            find_newest(&dir.path().join("gone")),
            Err(PersistenceError::NotADirectory { .. })
        ));
    }
}
