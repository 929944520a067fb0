//! Snapshot container types.

mod options;
mod snapshot;

pub use options::{DEFAULT_FILENAME, SNAPSHOT_EXTENSION, SaveOptions};
pub use snapshot::{FORMAT_MARKER, Snapshot, SnapshotRef};

/// Current container version.
///
/// The loader rejects files with version > CURRENT_SCHEMA_VERSION.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Magic bytes at the start of .spmdb files.
///
/// Format: "SPM" + container generation byte.
pub const MAGIC_BYTES: [u8; 4] = [b'S', b'P', b'M', 0x01];

/// Magic plus version.
pub(crate) const HEADER_LEN: usize = 8;
