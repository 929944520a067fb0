//! Shared data model for the scanning-probe microscopy data browser.
//!
//! Every other crate in the workspace speaks in these types: record
//! identities ([`DataId`]), file fingerprints, the closed set of property
//! values the store can hold, the store layers, and the parsed content a
//! data loader hands back.

pub mod error;
pub mod fingerprint;
pub mod ids;
pub mod layer;
pub mod loaded;
pub mod value;

pub use error::{ModelError, Result};
pub use fingerprint::{FileFingerprint, META_KEYS};
pub use ids::{DataId, FileKind};
pub use layer::{Layer, Scope};
pub use loaded::{ChannelData, Direction, LoadedFile, header_keys};
pub use value::PropValue;
