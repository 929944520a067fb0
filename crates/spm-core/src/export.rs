//! Plain-text export of likes and tags.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::database::Database;
use crate::error::{CoreError, Result};

/// File written into the browsed directory.
pub const ANNOTATIONS_FILENAME: &str = "liked_and_tags.txt";

impl Database {
    /// Writes one line per liked or tagged record to
    /// [`ANNOTATIONS_FILENAME`], replacing any previous export.
    ///
    /// Lines read `<filename>[ liked][ tags: ['a', 'b']]`, in store order.
    pub fn export_annotations(&self) -> Result<PathBuf> {
        let lines = self.read(|store| {
            if store.is_empty() {
                return Err(CoreError::EmptyDatabase);
            }
            Ok(store.annotation_lines())
        })?;

        let path = self.directory().join(ANNOTATIONS_FILENAME);
        fs::write(&path, lines.join("\n")).map_err(|source| CoreError::Export {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), lines = lines.len(), "exported annotations");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenOptions;
    use spm_ingest::{DataLoader, LoadError};
    use spm_model::LoadedFile;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn loader() -> Arc<dyn DataLoader> {
        Arc::new(|path: &Path| -> std::result::Result<LoadedFile, LoadError> {
            Err(LoadError::UnsupportedKind {
                path: path.to_path_buf(),
            })
        })
    }

    #[test]
    fn writes_liked_and_tagged_records() {
        let dir = TempDir::new().unwrap();
        for name in ["a.sxm", "b.dat", "c.dat"] {
            fs::write(dir.path().join(name), name).unwrap();
        }
        let db = Database::open(dir.path(), &OpenOptions::default(), loader()).unwrap();
        db.modify(|store| {
            store.set_liked("a.sxm", true);
            store.add_tag("c.dat", "gold");
            store.add_tag("c.dat", "step");
        });

        let path = db.export_annotations().unwrap();
        let text = fs::read_to_string(path).unwrap();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, vec!["a.sxm liked", "c.dat tags: ['gold', 'step']"]);
    }

    #[test]
    fn empty_database_is_an_error() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path(), &OpenOptions::default(), loader()).unwrap();
        assert!(matches!(db.export_annotations(), Err(CoreError::EmptyDatabase)));
        assert!(!dir.path().join(ANNOTATIONS_FILENAME).exists());
    }
}
