//! Snapshot saving.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use spm_store::keys::super_keys;
use spm_store::{LoadedCache, PropertyStore, WriteMode};
use tracing::{info, warn};

use crate::error::{PersistenceError, Result};
use crate::types::{
    CURRENT_SCHEMA_VERSION, HEADER_LEN, MAGIC_BYTES, SNAPSHOT_EXTENSION, SaveOptions, SnapshotRef,
};

/// Save the store (and optionally the cache) into `directory`.
///
/// Stamps `db_save_time` first. Without `overwrite`, an existing file is
/// kept and the next free `<stem>_N` name is used instead. The write goes
/// through a temp file and a rename, so the target is never left
/// truncated. On success the store is marked clean; on failure it stays
/// dirty.
///
/// Returns the path written.
pub fn save_snapshot(
    store: &mut PropertyStore,
    cache: &LoadedCache,
    directory: &Path,
    options: &SaveOptions,
) -> Result<PathBuf> {
    if !directory.is_dir() {
        return Err(PersistenceError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    store.write_super(super_keys::DB_SAVE_TIME, Utc::now(), WriteMode::CREATE_KEY);

    let requested = with_snapshot_extension(&options.filename);
    let filename = if options.overwrite {
        requested
    } else {
        unused_filename(directory, &requested)
    };
    let path = directory.join(&filename);

    store.dirty_mut().start_save();
    let cache = options.include_cache.then_some(cache);
    let result = encode_snapshot(&SnapshotRef::new(store, cache))
        .and_then(|bytes| write_atomic(&path, &bytes));

    match result {
        Ok(()) => {
            store.dirty_mut().save_complete();
            info!(
                path = %path.display(),
                records = store.len(),
                with_cache = cache.is_some(),
                overwrite = options.overwrite,
                "saved snapshot"
            );
            Ok(path)
        }
        Err(err) => {
            store.dirty_mut().save_failed();
            warn!(path = %path.display(), error = %err, "snapshot not saved");
            Err(err)
        }
    }
}

/// `filename` if it is free in `directory`, else the first free
/// `<stem>_1.<ext>`, `<stem>_2.<ext>`, ...
pub fn unused_filename(directory: &Path, filename: &str) -> String {
    if !directory.join(filename).exists() {
        return filename.to_string();
    }
    let as_path = Path::new(filename);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let extension = as_path.extension().and_then(|e| e.to_str());
    (1..)
        .map(|i| match extension {
            Some(ext) => format!("{stem}_{i}.{ext}"),
            None => format!("{stem}_{i}"),
        })
        .find(|candidate| !directory.join(candidate).exists())
        .unwrap_or_else(|| filename.to_string())
}

/// `filename`, with the snapshot extension appended unless it has it.
/// Snapshots are only found by that extension.
pub fn with_snapshot_extension(filename: &str) -> String {
    if Path::new(filename)
        .extension()
        .is_some_and(|ext| ext == SNAPSHOT_EXTENSION)
    {
        filename.to_string()
    } else {
        format!("{filename}.{SNAPSHOT_EXTENSION}")
    }
}

/// Serialize a snapshot to bytes.
///
/// Format:
/// - 4 bytes: Magic ("SPM\x01")
/// - 4 bytes: Container version (u32 little-endian)
/// - N bytes: JSON payload
pub fn encode_snapshot(snapshot: &SnapshotRef<'_>) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(snapshot)
        .map_err(|source| PersistenceError::Serialization { source })?;

    let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
    output.extend_from_slice(&MAGIC_BYTES);
    output.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Write to a temp file next to `path`, then rename onto it.
///
/// The temp file is removed whenever a step fails.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("spmdb.tmp");

    let result = write_temp(&temp_path, bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|source| PersistenceError::AtomicWriteFailed {
            temp_path: temp_path.clone(),
            target_path: path.to_path_buf(),
            source,
        })
    });
    if result.is_err() && temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        File::create(temp_path).map_err(|e| PersistenceError::io("create", temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| PersistenceError::io("write", temp_path, e))?;
    file.sync_all()
        .map_err(|e| PersistenceError::io("sync", temp_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spm_model::{DataId, FileFingerprint, PropValue};
    use tempfile::tempdir;

    fn store() -> PropertyStore {
        let mut store = PropertyStore::new();
        store.add_record(&FileFingerprint::new(
            DataId::new("a.sxm").unwrap(),
            100,
            Utc.timestamp_opt(1000, 0).unwrap(),
        ));
        store.create_super_properties();
        store
    }

    #[test]
    fn test_save_stamps_time_and_marks_clean() {
        let dir = tempdir().unwrap();
        let mut store = store();
        assert!(store.is_dirty());

        let path = save_snapshot(&mut store, &LoadedCache::new(), dir.path(), &SaveOptions::default())
            .unwrap();

        assert_eq!(path, dir.path().join("_database.spmdb"));
        assert!(!store.is_dirty());
        assert!(matches!(
            store.get_super(super_keys::DB_SAVE_TIME),
            Some(PropValue::Time(_))
        ));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], &MAGIC_BYTES);
        assert!(!dir.path().join("_database.spmdb.tmp").exists());
    }

    #[test]
    fn test_existing_files_are_kept_without_overwrite() {
        let dir = tempdir().unwrap();
        let mut store = store();
        let cache = LoadedCache::new();
        let options = SaveOptions::default();

        let first = save_snapshot(&mut store, &cache, dir.path(), &options).unwrap();
        let second = save_snapshot(&mut store, &cache, dir.path(), &options).unwrap();
        let third = save_snapshot(&mut store, &cache, dir.path(), &options).unwrap();
        assert_eq!(first.file_name().unwrap(), "_database.spmdb");
        assert_eq!(second.file_name().unwrap(), "_database_1.spmdb");
        assert_eq!(third.file_name().unwrap(), "_database_2.spmdb");

        let again = save_snapshot(&mut store, &cache, dir.path(), &options.with_overwrite(true))
            .unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_custom_names_get_the_snapshot_extension() {
        let dir = tempdir().unwrap();
        let mut store = store();
        let options = SaveOptions::default().with_filename("mine");

        let path = save_snapshot(&mut store, &LoadedCache::new(), dir.path(), &options).unwrap();
        assert_eq!(path, dir.path().join("mine.spmdb"));
        assert_eq!(
            crate::find_newest(dir.path()).unwrap().as_deref(),
            Some("mine.spmdb")
        );
        assert_eq!(with_snapshot_extension("run.db"), "run.db.spmdb");
        assert_eq!(with_snapshot_extension("run.spmdb"), "run.spmdb");
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("taken.spmdb");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inside"), b"x").unwrap();

        let result = write_atomic(&target, b"payload");
        assert!(matches!(result, Err(PersistenceError::AtomicWriteFailed { .. })));
        assert!(!dir.path().join("taken.spmdb.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn test_unused_filename_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("db"), b"").unwrap();
        assert_eq!(unused_filename(dir.path(), "db"), "db_1");
        assert_eq!(unused_filename(dir.path(), "other.spmdb"), "other.spmdb");
    }

    #[test]
    fn test_missing_directory_leaves_store_dirty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let mut store = store();
        let result = save_snapshot(&mut store, &LoadedCache::new(), &missing, &SaveOptions::default());
        assert!(matches!(result, Err(PersistenceError::NotADirectory { .. })));
        assert!(store.is_dirty());
    }
}
