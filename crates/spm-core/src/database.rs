//! The database manager for one browsed directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spm_ingest::{DataLoader, check_filenames, index_directory, reconcile};
use spm_model::{DataId, FileFingerprint, LoadedFile};
use spm_persistence::{PersistenceError, SaveOptions, Snapshot, find_newest, load_snapshot, save_snapshot};
use spm_store::{LoadedCache, PropertyStore};
use tracing::{debug, info, info_span, warn};

use crate::config::{OpenOptions, SnapshotChoice};
use crate::error::{CoreError, Result};

/// Why [`Database::open`] imported the directory from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportReason {
    Forced,
    NoSnapshot,
    SnapshotUnreadable,
    /// The snapshot tracks more files than the directory holds.
    MoreRecordsThanFiles,
    /// A tracked file changed size or modification time.
    Incompatible,
}

/// What [`Database::open`] started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Imported { reason: ImportReason, records: usize },
    Restored { snapshot: String },
    /// Restored, then untracked files were added.
    Merged { snapshot: String, new_elements: Vec<DataId> },
}

/// Result of [`Database::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    NoChanges,
    NewElements(Vec<DataId>),
    /// A tracked file changed on disk. Nothing was merged; see
    /// [`Database::reimport`].
    Incompatible,
}

struct State {
    store: PropertyStore,
    cache: LoadedCache,
    save_options: SaveOptions,
}

impl State {
    fn new(save_options: SaveOptions) -> Self {
        Self {
            store: PropertyStore::new(),
            cache: LoadedCache::new(),
            save_options,
        }
    }
}

/// Property store, loaded-file cache and save settings of one directory.
///
/// All mutation, including the stamp-write-mark-clean save sequence, runs
/// under one lock, so a `Database` can be shared with a
/// [`RefreshLoop`](crate::RefreshLoop) through an `Arc`.
pub struct Database {
    directory: PathBuf,
    loader: Arc<dyn DataLoader>,
    state: Mutex<State>,
    opened: OpenOutcome,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("directory", &self.directory)
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens `directory`, restoring a snapshot when one fits.
    ///
    /// Falls back to a full import when forced, when no snapshot is usable,
    /// when the snapshot tracks more files than exist, or when a tracked
    /// file changed. Untracked files are merged into a restored snapshot.
    pub fn open(
        directory: impl Into<PathBuf>,
        options: &OpenOptions,
        loader: Arc<dyn DataLoader>,
    ) -> Result<Self> {
        let directory = directory.into();
        let _span = info_span!("open", directory = %directory.display()).entered();

        let fresh = index_directory(&directory)?;
        check_filenames(&fresh);

        let (state, opened) = if options.force_new_import {
            import(&directory, loader.as_ref(), &fresh, ImportReason::Forced)
        } else {
            restore(&directory, loader.as_ref(), &options.snapshot, &fresh)
        };

        let db = Self {
            directory,
            loader,
            state: Mutex::new(state),
            opened,
        };
        if options.save_after_open {
            db.save()?;
        }
        Ok(db)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn opened(&self) -> &OpenOutcome {
        &self.opened
    }

    /// Re-indexes the directory and merges untracked files.
    ///
    /// Never mutates the store when the directory is incompatible. New
    /// files are parsed without holding the lock.
    pub fn update(&self) -> Result<UpdateOutcome> {
        let fresh = index_directory(&self.directory)?;
        let recorded = self.lock().store.fingerprints();
        let result = reconcile(&recorded, &fresh);

        if result.is_incompatible {
            warn!(
                directory = %self.directory.display(),
                "directory no longer matches the database; re-import to recover"
            );
            return Ok(UpdateOutcome::Incompatible);
        }
        if !result.has_new_elements {
            debug!("no new files");
            return Ok(UpdateOutcome::NoChanges);
        }
        let loaded = load_new_elements(&self.directory, self.loader.as_ref(), &result.new_elements);
        let added = merge_new_elements(&mut self.lock(), &result.new_elements, loaded);
        Ok(UpdateOutcome::NewElements(added))
    }

    /// Discards the store and cache and imports the directory again.
    ///
    /// Save settings are kept. Returns the number of records.
    pub fn reimport(&self) -> Result<usize> {
        let fresh = index_directory(&self.directory)?;
        check_filenames(&fresh);
        let (imported, _) = import(
            &self.directory,
            self.loader.as_ref(),
            &fresh,
            ImportReason::Forced,
        );

        let mut state = self.lock();
        let save_options = std::mem::take(&mut state.save_options);
        *state = State {
            save_options,
            ..imported
        };
        Ok(state.store.len())
    }

    /// Loads a record's file into the cache unless it is there already.
    pub fn ensure_loaded(&self, id: &str) -> Result<()> {
        {
            let state = self.lock();
            if state.cache.contains(id) {
                return Ok(());
            }
            if !state.store.contains(id) {
                return Err(CoreError::UnknownRecord(id.to_string()));
            }
        }

        let data_id = DataId::new(id).map_err(|_| CoreError::UnknownRecord(id.to_string()))?;
        let file = self
            .loader
            .load(&self.directory.join(id))
            .map_err(|source| CoreError::Load {
                id: data_id.clone(),
                source,
            })?;
        debug!(data_id = id, channels = file.channels.len(), "loaded on demand");

        let mut cached = LoadedCache::new();
        cached.insert(data_id, file);
        self.lock().cache.merge_missing(cached);
        Ok(())
    }

    /// Parsed content of a record, loading it on first access.
    pub fn loaded(&self, id: &str) -> Result<LoadedFile> {
        self.ensure_loaded(id)?;
        self.lock()
            .cache
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownRecord(id.to_string()))
    }

    /// Saves with the current save settings. Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let options = self.save_options();
        self.save_with(&options)
    }

    pub fn save_with(&self, options: &SaveOptions) -> Result<PathBuf> {
        let mut state = self.lock();
        let State { store, cache, .. } = &mut *state;
        Ok(save_snapshot(store, cache, &self.directory, options)?)
    }

    pub fn save_options(&self) -> SaveOptions {
        self.lock().save_options.clone()
    }

    /// Replaces the settings used by [`save`](Self::save) and background
    /// flushes.
    pub fn set_save_options(&self, options: SaveOptions) {
        self.lock().save_options = options;
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().store.is_dirty()
    }

    /// A copy of the property store.
    pub fn store(&self) -> PropertyStore {
        self.lock().store.clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&PropertyStore) -> R) -> R {
        f(&self.lock().store)
    }

    pub fn modify<R>(&self, f: impl FnOnce(&mut PropertyStore) -> R) -> R {
        f(&mut self.lock().store)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn import(
    directory: &Path,
    loader: &dyn DataLoader,
    fresh: &[FileFingerprint],
    reason: ImportReason,
) -> (State, OpenOutcome) {
    let mut state = State::new(SaveOptions::default());
    state.store.create_super_properties();
    let loaded = load_new_elements(directory, loader, fresh);
    let added = merge_new_elements(&mut state, fresh, loaded);
    info!(?reason, records = added.len(), "imported directory");
    (
        state,
        OpenOutcome::Imported {
            reason,
            records: added.len(),
        },
    )
}

fn restore(
    directory: &Path,
    loader: &dyn DataLoader,
    choice: &SnapshotChoice,
    fresh: &[FileFingerprint],
) -> (State, OpenOutcome) {
    let (name, snapshot) = match pick_snapshot(directory, choice) {
        Ok(Some(found)) => found,
        Ok(None) => {
            info!("no snapshot found; importing");
            return import(directory, loader, fresh, ImportReason::NoSnapshot);
        }
        Err(err) => {
            warn!(error = %err, "snapshot unreadable; importing");
            return import(directory, loader, fresh, ImportReason::SnapshotUnreadable);
        }
    };

    let recorded = snapshot.property_store.fingerprints();
    if recorded.len() > fresh.len() {
        warn!(
            snapshot = %name,
            recorded = recorded.len(),
            on_disk = fresh.len(),
            "snapshot tracks more files than the directory holds; importing"
        );
        return import(directory, loader, fresh, ImportReason::MoreRecordsThanFiles);
    }

    let result = reconcile(&recorded, fresh);
    if result.is_incompatible {
        warn!(snapshot = %name, "snapshot does not match the directory; importing");
        return import(directory, loader, fresh, ImportReason::Incompatible);
    }

    let mut state = State {
        store: snapshot.property_store,
        cache: snapshot.cache,
        save_options: SaveOptions::default().with_filename(name.clone()),
    };
    state.store.create_super_properties();
    state.store.populate_all_defaults();

    if result.has_new_elements {
        let loaded = load_new_elements(directory, loader, &result.new_elements);
        let new_elements = merge_new_elements(&mut state, &result.new_elements, loaded);
        (
            state,
            OpenOutcome::Merged {
                snapshot: name,
                new_elements,
            },
        )
    } else {
        let ids = state.store.ids();
        let loaded = load_missing(directory, loader, &mut state.cache, &ids);
        info!(snapshot = %name, records = ids.len(), loaded, "restored snapshot");
        (state, OpenOutcome::Restored { snapshot: name })
    }
}

/// The snapshot to start from and its file name.
///
/// A named snapshot that cannot be read falls back to the newest one.
fn pick_snapshot(
    directory: &Path,
    choice: &SnapshotChoice,
) -> std::result::Result<Option<(String, Snapshot)>, PersistenceError> {
    if let SnapshotChoice::Named(name) = choice {
        match load_snapshot(directory, name) {
            Ok(snapshot) => return Ok(Some((name.clone(), snapshot))),
            Err(err) => {
                warn!(snapshot = %name, error = %err, "chosen snapshot unusable; looking for the newest")
            }
        }
    }
    let Some(name) = find_newest(directory)? else {
        return Ok(None);
    };
    let snapshot = load_snapshot(directory, &name)?;
    Ok(Some((name, snapshot)))
}

/// Parses the files of `new`. Failures are logged and skipped.
fn load_new_elements(
    directory: &Path,
    loader: &dyn DataLoader,
    new: &[FileFingerprint],
) -> LoadedCache {
    let ids: Vec<DataId> = new.iter().map(|fp| fp.filename.clone()).collect();
    let mut loaded = LoadedCache::new();
    load_missing(directory, loader, &mut loaded, &ids);
    loaded
}

/// Records `new` and fills in derived properties from `loaded`.
///
/// Ids recorded in the meantime are skipped.
fn merge_new_elements(
    state: &mut State,
    new: &[FileFingerprint],
    loaded: LoadedCache,
) -> Vec<DataId> {
    let added: Vec<DataId> = new
        .iter()
        .filter(|fp| state.store.add_record(fp).is_success())
        .map(|fp| fp.filename.clone())
        .collect();

    state.cache.merge_missing(loaded);
    state.store.populate_all_defaults();
    state.store.pick_favorite_channels(&state.cache);
    state.store.record_channel_names(&state.cache);
    state.store.resort_by_time();

    info!(count = added.len(), "added new elements");
    added
}

/// Loads every id not yet cached. Failures are logged and skipped.
fn load_missing(
    directory: &Path,
    loader: &dyn DataLoader,
    cache: &mut LoadedCache,
    ids: &[DataId],
) -> usize {
    let mut loaded = 0;
    for id in ids {
        if cache.contains(id.as_str()) {
            continue;
        }
        match loader.load(&directory.join(id.as_str())) {
            Ok(file) => {
                cache.insert(id.clone(), file);
                loaded += 1;
            }
            Err(err) => warn!(data_id = %id, error = %err, "file not loaded"),
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use spm_ingest::LoadError;
    use spm_model::{ChannelData, FileKind, PropValue};
    use spm_store::keys;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, size: usize, secs: i64) {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; size]).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    fn stub_loader() -> Arc<dyn DataLoader> {
        Arc::new(|path: &Path| -> std::result::Result<LoadedFile, LoadError> {
            let kind = if path.extension().is_some_and(|ext| ext == "sxm") {
                FileKind::Scan
            } else {
                FileKind::Spectrum
            };
            let mut file = LoadedFile::new(kind);
            for channel in ["V", "dIdV"] {
                file.insert_channel(channel, ChannelData::curve("", vec![0.0]));
            }
            Ok(file)
        })
    }

    fn session() -> TempDir {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.sxm", 100, 1000);
        touch(dir.path(), "b.dat", 50, 2000);
        dir
    }

    fn names(ids: &[DataId]) -> Vec<&str> {
        ids.iter().map(DataId::as_str).collect()
    }

    #[test]
    fn first_open_imports_everything() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();

        assert_eq!(
            db.opened(),
            &OpenOutcome::Imported {
                reason: ImportReason::NoSnapshot,
                records: 2
            }
        );
        let store = db.store();
        assert_eq!(names(&store.ids()), vec!["b.dat", "a.sxm"]);
        assert_eq!(
            store.get_data("b.dat", keys::FYCHANNEL),
            Some(&PropValue::Text("dIdV".into()))
        );
        assert_eq!(
            store.get_data("a.sxm", keys::CHANNEL_NAMES),
            Some(&PropValue::text_list(["V", "dIdV"]))
        );
        assert!(db.is_dirty());
    }

    #[test]
    fn reopen_restores_annotations() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        db.modify(|store| store.add_tag("a.sxm", "gold"));
        db.save().unwrap();
        assert!(!db.is_dirty());

        let again = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(
            again.opened(),
            &OpenOutcome::Restored {
                snapshot: "_database.spmdb".into()
            }
        );
        assert_eq!(again.read(|store| store.tags("a.sxm")), vec!["gold"]);
        assert!(!again.is_dirty());
    }

    #[test]
    fn reopen_merges_untracked_files() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        db.modify(|store| store.set_liked("b.dat", true));
        db.save().unwrap();
        touch(dir.path(), "c.dat", 10, 3000);

        let again = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(
            again.opened(),
            &OpenOutcome::Merged {
                snapshot: "_database.spmdb".into(),
                new_elements: vec![DataId::new("c.dat").unwrap()]
            }
        );
        let store = again.store();
        assert_eq!(names(&store.ids()), vec!["c.dat", "b.dat", "a.sxm"]);
        assert!(store.is_liked("b.dat"));
    }

    #[test]
    fn changed_or_missing_files_force_an_import() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        db.modify(|store| store.add_tag("a.sxm", "gold"));
        db.save().unwrap();

        touch(dir.path(), "a.sxm", 101, 1000);
        let changed = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(
            changed.opened(),
            &OpenOutcome::Imported {
                reason: ImportReason::Incompatible,
                records: 2
            }
        );
        assert!(changed.read(|store| store.tags("a.sxm")).is_empty());

        std::fs::remove_file(dir.path().join("b.dat")).unwrap();
        let shrunk = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(
            shrunk.opened(),
            &OpenOutcome::Imported {
                reason: ImportReason::MoreRecordsThanFiles,
                records: 1
            }
        );
    }

    #[test]
    fn forced_import_ignores_snapshots() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        db.save().unwrap();

        let options = OpenOptions {
            force_new_import: true,
            ..OpenOptions::default()
        };
        let forced = Database::open(dir.path(), &options, stub_loader()).unwrap();
        assert!(matches!(
            forced.opened(),
            OpenOutcome::Imported {
                reason: ImportReason::Forced,
                ..
            }
        ));
    }

    #[test]
    fn unreadable_named_snapshot_falls_back_to_newest() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        db.save().unwrap();
        std::fs::write(dir.path().join("junk.spmdb"), b"junk").unwrap();

        let options = OpenOptions {
            snapshot: SnapshotChoice::Named("junk.spmdb".into()),
            ..OpenOptions::default()
        };
        let again = Database::open(dir.path(), &options, stub_loader()).unwrap();
        assert_eq!(
            again.opened(),
            &OpenOutcome::Restored {
                snapshot: "_database.spmdb".into()
            }
        );
        assert_eq!(again.save_options().filename, "_database.spmdb");
    }

    #[test]
    fn update_merges_or_reports_incompatibility() {
        let dir = session();
        let db = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(db.update().unwrap(), UpdateOutcome::NoChanges);

        touch(dir.path(), "c.dat", 10, 3000);
        assert_eq!(
            db.update().unwrap(),
            UpdateOutcome::NewElements(vec![DataId::new("c.dat").unwrap()])
        );

        db.modify(|store| store.add_tag("c.dat", "fresh"));
        touch(dir.path(), "a.sxm", 999, 1000);
        let before = db.store();
        assert_eq!(db.update().unwrap(), UpdateOutcome::Incompatible);
        assert_eq!(db.store(), before);

        assert_eq!(db.reimport().unwrap(), 3);
        assert!(db.read(|store| store.tags("c.dat")).is_empty());
        assert_eq!(db.update().unwrap(), UpdateOutcome::NoChanges);
    }

    #[test]
    fn update_parses_new_files_outside_the_lock() {
        let dir = session();
        let handle: Arc<OnceLock<Weak<Database>>> = Arc::default();
        let seen_during_load = Arc::new(AtomicUsize::new(0));
        let loader: Arc<dyn DataLoader> = {
            let handle = Arc::clone(&handle);
            let seen = Arc::clone(&seen_during_load);
            Arc::new(move |_: &Path| -> std::result::Result<LoadedFile, LoadError> {
                if let Some(db) = handle.get().and_then(Weak::upgrade) {
                    seen.store(db.read(PropertyStore::len), Ordering::SeqCst);
                }
                Ok(LoadedFile::new(FileKind::Spectrum))
            })
        };
        let db = Arc::new(Database::open(dir.path(), &OpenOptions::default(), loader).unwrap());
        handle.set(Arc::downgrade(&db)).unwrap();

        touch(dir.path(), "c.dat", 10, 3000);
        assert_eq!(
            db.update().unwrap(),
            UpdateOutcome::NewElements(vec![DataId::new("c.dat").unwrap()])
        );
        assert_eq!(seen_during_load.load(Ordering::SeqCst), 2);
        assert_eq!(db.store().len(), 3);
    }

    #[test]
    fn lazy_loading() {
        let dir = session();
        let failing: Arc<dyn DataLoader> =
            Arc::new(|path: &Path| -> std::result::Result<LoadedFile, LoadError> {
                Err(LoadError::UnsupportedKind {
                    path: path.to_path_buf(),
                })
            });
        let db = Database::open(dir.path(), &OpenOptions::default(), failing).unwrap();
        assert_eq!(db.store().len(), 2);
        assert!(matches!(
            db.ensure_loaded("a.sxm"),
            Err(CoreError::Load { .. })
        ));
        assert!(matches!(
            db.ensure_loaded("ghost.sxm"),
            Err(CoreError::UnknownRecord(_))
        ));

        let ok = Database::open(dir.path(), &OpenOptions::default(), stub_loader()).unwrap();
        assert_eq!(ok.loaded("a.sxm").unwrap().kind, FileKind::Scan);
    }

    #[test]
    fn save_after_open_writes_a_snapshot() {
        let dir = session();
        let options = OpenOptions {
            save_after_open: true,
            ..OpenOptions::default()
        };
        let db = Database::open(dir.path(), &options, stub_loader()).unwrap();
        assert!(!db.is_dirty());
        assert!(dir.path().join("_database.spmdb").exists());
    }
}
