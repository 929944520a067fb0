//! Getting measurement files into the browser.
//!
//! - **Indexing**: [`index_directory`] fingerprints every `.sxm`/`.dat` file
//!   in a directory without opening it.
//! - **Reconciliation**: [`reconcile`] compares recorded fingerprints with a
//!   fresh index and reports new files or an incompatible change.
//! - **Loading**: the [`DataLoader`] seam, with [`NanonisLoader`] reading
//!   Nanonis scans and spectra.

mod discovery;
mod error;
mod loader;
mod nanonis;
mod reconcile;

// === Error Types ===
pub use error::{IngestError, LoadError, Result};

// === File Discovery ===
pub use discovery::{check_filenames, count_by_kind, index_directory};

// === Reconciliation ===
pub use reconcile::{Reconciliation, reconcile};

// === Loading ===
pub use loader::{DataLoader, NanonisLoader};
pub use nanonis::channel_nickname;
