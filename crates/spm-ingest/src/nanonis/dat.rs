//! Nanonis `.dat` spectroscopy files.
//!
//! Layout: tab-separated `key\tvalue` header lines, a `[DATA]` marker, one
//! tab-separated line of `Name (unit)` column titles, then one row of
//! samples per line. Columns titled `Name [bwd] (unit)` hold the backward
//! sweep of `Name`.

use std::collections::HashMap;
use std::path::Path;

use spm_model::{ChannelData, FileKind, LoadedFile};

use super::{split_unit, unique_channel_name};
use crate::error::LoadError;

const DATA_MARKER: &str = "[DATA]";
const BACKWARD_SUFFIX: &str = " [bwd]";

pub(crate) fn parse(path: &Path, bytes: &[u8]) -> Result<LoadedFile, LoadError> {
    let text = String::from_utf8_lossy(bytes);
    let mut lines = text.lines();
    let mut file = LoadedFile::new(FileKind::Spectrum);

    let mut found_marker = false;
    for line in lines.by_ref() {
        if line.trim() == DATA_MARKER {
            found_marker = true;
            break;
        }
        let mut fields = line.split('\t');
        let key = fields.next().unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        let value = fields.next().unwrap_or("").trim();
        file.header.insert(key.to_lowercase(), value.to_string());
    }
    if !found_marker {
        return Err(LoadError::MissingDataSection {
            path: path.to_path_buf(),
        });
    }

    let titles: Vec<&str> = lines
        .by_ref()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| LoadError::malformed(path, "no column titles after [DATA]"))?
        .split('\t')
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); titles.len()];
    for (offset, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values: Vec<&str> = line
            .split('\t')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        if values.len() != titles.len() {
            return Err(LoadError::malformed(
                path,
                format!(
                    "data row {} has {} values, expected {}",
                    offset + 1,
                    values.len(),
                    titles.len()
                ),
            ));
        }
        for (column, value) in columns.iter_mut().zip(values) {
            let sample = value.parse::<f64>().map_err(|_| {
                LoadError::malformed(path, format!("'{value}' in data row {} is not a number", offset + 1))
            })?;
            column.push(sample);
        }
    }

    let mut assigned: HashMap<&str, String> = HashMap::new();
    let mut backward: Vec<(&str, Vec<f64>)> = Vec::new();
    for (title, samples) in titles.iter().zip(columns) {
        let (name, unit) = split_unit(title);
        if let Some(base) = name.strip_suffix(BACKWARD_SUFFIX) {
            backward.push((base, samples));
            continue;
        }
        let channel = unique_channel_name(name, &file.channels);
        assigned.insert(name, channel.clone());
        file.insert_channel(channel, ChannelData::curve(unit, samples));
    }
    for (base, samples) in backward {
        let target = assigned
            .get(base)
            .and_then(|channel| file.data.get_mut(channel));
        match target {
            Some(data) => data.backward = Some(samples),
            None => {
                return Err(LoadError::malformed(
                    path,
                    format!("backward column for unknown channel '{base}'"),
                ));
            }
        }
    }

    Ok(file)
}
