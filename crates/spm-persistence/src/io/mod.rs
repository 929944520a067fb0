//! File I/O for snapshots.
//!
//! - Saving with collision-avoiding names and atomic writes
//! - Loading with container and marker validation
//! - Discovering the most recently saved snapshot of a directory

mod load;
mod newest;
mod save;

pub use load::{load_snapshot, load_snapshot_file};
pub use newest::{find_newest, snapshot_files};
pub use save::{encode_snapshot, save_snapshot, unused_filename, with_snapshot_extension};
