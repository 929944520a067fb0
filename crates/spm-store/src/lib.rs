//! Layered property store for the scanning-probe microscopy data browser.
//!
//! A [`PropertyStore`] holds four layers of properties for one browsed
//! directory:
//!
//! ```text
//! data_prop  one record per measurement file, keyed by file name
//! super      directory-wide browser state (sort order, open viewers, ...)
//! link       free-form cross references
//! stitch     aggregate records keyed by a composite id
//! ```
//!
//! Reads never fail; writes report a [`WriteOutcome`] and leave the store
//! untouched when refused. Successful writes mark the store dirty so the
//! persistence layer knows when a snapshot is due.
//!
//! On top of the read/write contract the crate provides default population,
//! time ordering and sort views, annotations (likes, checks, tags) and the
//! favourite-channel heuristic driven by a [`LoadedCache`].

mod annotate;
mod cache;
mod channels;
mod defaults;
mod dirty;
pub mod keys;
mod order;
mod outcome;
mod store;

// Re-export main types
pub use cache::LoadedCache;
pub use channels::{Favorite, RecordIssue, favorite_channel};
pub use defaults::{kind_keys, shared_defaults};
pub use dirty::DirtyTracker;
pub use order::SortMode;
pub use outcome::{Refusal, WriteMode, WriteOutcome};
pub use store::{PropertyStore, Record};
