//! Property store layers and the scope a read or write targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One layer of the property store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Per-file properties keyed by [`crate::DataId`].
    Data,
    /// Process-wide display state.
    Super,
    /// Named references to artifacts created on demand.
    Link,
    /// Multi-file aggregate records keyed by a composite id.
    Stitch,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Data => "data_prop",
            Layer::Super => "super",
            Layer::Link => "link",
            Layer::Stitch => "stitch",
        }
    }

    /// Whether entries in this layer live under a per-record id.
    pub fn is_keyed(&self) -> bool {
        matches!(self, Layer::Data | Layer::Stitch)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a property read or write.
///
/// Exactly one layer is addressed per call; the keyed layers carry their
/// record id, the global layers carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Data(&'a str),
    Super,
    Link,
    Stitch(&'a str),
}

impl<'a> Scope<'a> {
    pub fn layer(&self) -> Layer {
        match self {
            Scope::Data(_) => Layer::Data,
            Scope::Super => Layer::Super,
            Scope::Link => Layer::Link,
            Scope::Stitch(_) => Layer::Stitch,
        }
    }

    /// The record id for keyed layers.
    pub fn id(&self) -> Option<&'a str> {
        match self {
            Scope::Data(id) | Scope::Stitch(id) => Some(id),
            Scope::Super | Scope::Link => None,
        }
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}[{id}]", self.layer()),
            None => f.write_str(self.layer().as_str()),
        }
    }
}
