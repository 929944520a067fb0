//! Snapshot persistence for the data browser.
//!
//! A snapshot holds one directory's property store and, on request, the
//! loaded-file cache. Several snapshots may sit next to each other in the
//! browsed directory (`_database.spmdb`, `_database_1.spmdb`, ...); the one
//! with the latest `db_save_time` is the newest.
//!
//! # File Format
//!
//! ```text
//! +------------------+
//! | Magic: "SPM\x01" | 4 bytes - file identification
//! +------------------+
//! | Version: 1       | 4 bytes - u32 little-endian container version
//! +------------------+
//! | JSON payload     | { format_marker, property_store, cache? }
//! +------------------+
//! ```
//!
//! Property values are adjacently tagged in the payload, so booleans,
//! integers, floats, timestamps and nested lists reload exactly.

mod error;
mod io;
mod types;

// Re-export main types
pub use error::{PersistenceError, Result};
pub use io::{
    encode_snapshot, find_newest, load_snapshot, load_snapshot_file, save_snapshot,
    snapshot_files, unused_filename, with_snapshot_extension,
};
pub use types::{
    CURRENT_SCHEMA_VERSION, DEFAULT_FILENAME, FORMAT_MARKER, MAGIC_BYTES, SNAPSHOT_EXTENSION,
    SaveOptions, Snapshot, SnapshotRef,
};
