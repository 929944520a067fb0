//! The seam between the browser and file-format parsers.

use std::path::Path;

use spm_model::{DataId, FileKind, LoadedFile};

use crate::error::LoadError;
use crate::nanonis;

/// Parses one measurement file into a [`LoadedFile`].
///
/// Loaders are shared with the background refresh thread, so they must be
/// `Send + Sync`.
pub trait DataLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<LoadedFile, LoadError>;
}

impl<F> DataLoader for F
where
    F: Fn(&Path) -> Result<LoadedFile, LoadError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<LoadedFile, LoadError> {
        self(path)
    }
}

/// Loader for Nanonis `.sxm` scans and `.dat` spectra.
#[derive(Debug, Clone, Copy, Default)]
pub struct NanonisLoader;

impl DataLoader for NanonisLoader {
    fn load(&self, path: &Path) -> Result<LoadedFile, LoadError> {
        let kind = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| DataId::new(name).ok())
            .and_then(|id| id.kind())
            .ok_or_else(|| LoadError::UnsupportedKind {
                path: path.to_path_buf(),
            })?;

        let bytes = std::fs::read(path).map_err(|e| LoadError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        match kind {
            FileKind::Scan => nanonis::sxm::parse(path, &bytes),
            FileKind::Spectrum => nanonis::dat::parse(path, &bytes),
        }
    }
}
