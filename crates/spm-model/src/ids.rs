//! Record identities and file kinds.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Identity of a tracked measurement record: its bare filename.
///
/// The filename includes the extension and must be unique within the
/// browsed directory. Names with more than one `.` are accepted; the indexer
/// only warns about them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(String);

impl DataId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        if value.trim().is_empty() || value.contains(['/', '\\']) {
            return Err(ModelError::InvalidDataId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last `.`, or an empty string when there is none.
    pub fn extension(&self) -> &str {
        self.0.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
    }

    pub fn dot_count(&self) -> usize {
        self.0.matches('.').count()
    }

    pub fn has_multiple_dots(&self) -> bool {
        self.dot_count() > 1
    }

    /// The record kind implied by the extension, if it is a recognised one.
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_extension(self.extension())
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DataId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DataId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for DataId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The two measurement kinds the browser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Image scan (`.sxm`), 2D channel data.
    Scan,
    /// Point spectroscopy curve (`.dat`), 1D channel data.
    Spectrum,
}

impl FileKind {
    pub const ALL: [FileKind; 2] = [FileKind::Scan, FileKind::Spectrum];

    /// Matches the recognised extensions exactly, the way the browser does.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "sxm" => Some(FileKind::Scan),
            "dat" => Some(FileKind::Spectrum),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Scan => "sxm",
            FileKind::Spectrum => "dat",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Scan => "scan",
            FileKind::Spectrum => "spectrum",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = ModelError;

    /// Accepts either the kind name or its extension (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scan" | "sxm" => Ok(FileKind::Scan),
            "spectrum" | "dat" => Ok(FileKind::Spectrum),
            _ => Err(ModelError::UnknownFileKind(s.to_string())),
        }
    }
}
