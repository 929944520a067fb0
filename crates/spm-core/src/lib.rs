//! Database manager for one browsed measurement directory.
//!
//! [`Database::open`] decides between restoring a snapshot and importing
//! the directory, merges files that appeared since the snapshot was taken
//! and keeps the loaded-file cache in step with the property store.
//! [`RefreshLoop`] repeats the update check and flushes dirty stores in the
//! background. [`Mediator`] routes "open in viewer" requests into the
//! viewer state held by the store.
//!
//! ```text
//! directory ──index──▶ fingerprints ──reconcile──▶ Database ──save──▶ *.spmdb
//!                                                     ▲
//!                               RefreshLoop ──────────┤
//!                               Mediator ─────────────┘
//! ```

mod config;
mod database;
mod error;
mod export;
mod mediator;
mod refresh;

pub use config::{OpenOptions, RefreshConfig, SnapshotChoice};
pub use database::{Database, ImportReason, OpenOutcome, UpdateOutcome};
pub use error::{CoreError, Result};
pub use export::ANNOTATIONS_FILENAME;
pub use mediator::{Mediator, ViewerEvent, ViewerSlot, route};
pub use refresh::{RefreshEvent, RefreshLoop};
