//! Parsed content of a measurement file as returned by a data loader.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{FileKind, ModelError};

/// Normalised header keys the browser consults.
///
/// Loaders lower-case section names and join nested fields with `>`.
pub mod header_keys {
    /// `"1"` when the z-controller (feedback) is on.
    pub const FEEDBACK_ON: &str = "z-controller>on";
    /// `"ON"` / `"OFF"`.
    pub const LOCKIN_STATUS: &str = "lock-in>lock-in status";
    /// `"FALSE"` while the oscillation controller drives the tip.
    pub const OSCILLATION_OUTPUT_OFF: &str = "oscillation control>output off";
}

/// Scan direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward" | "fwd" => Ok(Direction::Forward),
            "backward" | "bwd" => Ok(Direction::Backward),
            _ => Err(format!("Unknown direction: {s}")),
        }
    }
}

/// Samples of one channel.
///
/// Scans store row-major images with `shape = Some((rows, cols))`;
/// spectra store plain curves with `shape = None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    pub unit: String,
    #[serde(with = "samples")]
    pub forward: Vec<f64>,
    #[serde(default, with = "optional_samples")]
    pub backward: Option<Vec<f64>>,
    pub shape: Option<(usize, usize)>,
}

impl ChannelData {
    pub fn curve(unit: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            unit: unit.into(),
            forward: samples,
            backward: None,
            shape: None,
        }
    }
}

/// Everything a loader extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedFile {
    pub kind: FileKind,
    /// Header entries in file order.
    pub header: IndexMap<String, String>,
    /// Channel names in file order.
    pub channels: Vec<String>,
    pub data: BTreeMap<String, ChannelData>,
}

impl LoadedFile {
    pub fn new(kind: FileKind) -> Self {
        Self {
            kind,
            header: IndexMap::new(),
            channels: Vec::new(),
            data: BTreeMap::new(),
        }
    }

    /// Raw header value for a normalised key.
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.header.get(name).map(String::as_str)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|channel| channel == name)
    }

    /// Samples and unit of a channel in the requested direction.
    pub fn get_channel(
        &self,
        name: &str,
        direction: Direction,
    ) -> Result<(&[f64], &str), ModelError> {
        let data = self
            .data
            .get(name)
            .ok_or_else(|| ModelError::UnknownChannel {
                channel: name.to_string(),
            })?;
        let samples = match direction {
            Direction::Forward => data.forward.as_slice(),
            Direction::Backward => {
                data.backward
                    .as_deref()
                    .ok_or_else(|| ModelError::MissingDirection {
                        channel: name.to_string(),
                        direction: direction.to_string(),
                    })?
            }
        };
        Ok((samples, data.unit.as_str()))
    }

    /// Adds a channel, keeping the channel list in insertion order.
    pub fn insert_channel(&mut self, name: impl Into<String>, data: ChannelData) {
        let name = name.into();
        if !self.has_channel(&name) {
            self.channels.push(name.clone());
        }
        self.data.insert(name, data);
    }
}

/// Samples are written with non-finite values as `null` (JSON has no NaN)
/// and read back as NaN.
mod samples {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect::<Vec<Option<f64>>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

mod optional_samples {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match values {
            Some(values) => super::samples::serialize(values, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        let values = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(values.map(|values| values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
    }
}
