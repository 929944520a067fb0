//! Nanonis `.sxm` scan files.
//!
//! A text header of `:SECTION:` lines, each followed by its value lines,
//! runs up to `:SCANIT_END:`. After the `0x1A 0x04` marker that follows it,
//! every channel listed in `:DATA_INFO:` stores `cols * rows` big-endian
//! `f32` samples per direction, forward first.

use std::path::Path;

use spm_model::{ChannelData, FileKind, LoadedFile};
use tracing::debug;

use super::unique_channel_name;
use crate::error::LoadError;

const HEADER_END: &[u8] = b":SCANIT_END:";
const DATA_MARKER: [u8; 2] = [0x1a, 0x04];
const KEY_PIXELS: &str = "scan_pixels";
const KEY_DATA_INFO: &str = "data_info";

struct DataInfo {
    name: String,
    unit: String,
    both_directions: bool,
}

pub(crate) fn parse(path: &Path, bytes: &[u8]) -> Result<LoadedFile, LoadError> {
    let header_len = find(bytes, HEADER_END).ok_or_else(|| LoadError::MissingDataSection {
        path: path.to_path_buf(),
    })?;
    let data_start = find(&bytes[header_len..], &DATA_MARKER)
        .map(|offset| header_len + offset + DATA_MARKER.len())
        .ok_or_else(|| LoadError::MissingDataSection {
            path: path.to_path_buf(),
        })?;

    let text = String::from_utf8_lossy(&bytes[..header_len]);
    let sections = split_sections(&text);

    let mut file = LoadedFile::new(FileKind::Scan);
    let mut data_info = Vec::new();
    for (key, values) in &sections {
        if key == KEY_DATA_INFO {
            data_info = parse_data_info(path, values)?;
        } else if is_table(values) {
            let columns: Vec<&str> = values[0].split('\t').map(str::trim).collect();
            let first: Vec<&str> = values[1].split('\t').map(str::trim).collect();
            for (column, value) in columns.iter().zip(first) {
                if !column.is_empty() {
                    file.header
                        .insert(format!("{key}>{}", column.to_lowercase()), value.to_string());
                }
            }
        } else {
            let joined: Vec<&str> = values.iter().map(|v| v.trim()).collect();
            file.header.insert(key.clone(), joined.join("\n"));
        }
    }

    let (cols, rows) = file
        .get_param(KEY_PIXELS)
        .and_then(|value| {
            let mut parts = value.split_whitespace().map(str::parse::<usize>);
            match (parts.next(), parts.next()) {
                (Some(Ok(cols)), Some(Ok(rows))) => Some((cols, rows)),
                _ => None,
            }
        })
        .ok_or_else(|| LoadError::malformed(path, "missing or invalid :SCAN_PIXELS:"))?;

    let images: usize = data_info
        .iter()
        .map(|info| if info.both_directions { 2 } else { 1 })
        .sum();
    let (per_image, expected) = cols
        .checked_mul(rows)
        .and_then(|per_image| Some((per_image, per_image.checked_mul(images)?)))
        .ok_or_else(|| {
            LoadError::malformed(path, format!(":SCAN_PIXELS: {cols} x {rows} is out of range"))
        })?;
    let available = (bytes.len() - data_start) / 4;
    if available < expected {
        return Err(LoadError::malformed(
            path,
            format!("data block holds {available} samples, expected {expected}"),
        ));
    }

    let mut samples = bytes[data_start..]
        .chunks_exact(4)
        .map(|chunk| f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64);
    for info in data_info {
        let forward: Vec<f64> = samples.by_ref().take(per_image).collect();
        let backward = if info.both_directions {
            let mut image: Vec<f64> = samples.by_ref().take(per_image).collect();
            // Backward lines are recorded right to left.
            if cols > 0 {
                for line in image.chunks_mut(cols) {
                    line.reverse();
                }
            }
            Some(image)
        } else {
            None
        };
        let name = unique_channel_name(&info.name, &file.channels);
        file.insert_channel(
            name,
            ChannelData {
                unit: info.unit,
                forward,
                backward,
                shape: Some((rows, cols)),
            },
        );
    }
    debug!(path = %path.display(), channels = file.channels.len(), "parsed scan");

    Ok(file)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// `(lower-cased section name, value lines)` in file order.
fn split_sections(text: &str) -> Vec<(String, Vec<&str>)> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.len() > 1 && trimmed.starts_with(':') && trimmed.ends_with(':') {
            let key = trimmed[1..trimmed.len() - 1].to_lowercase();
            sections.push((key, Vec::new()));
        } else if let Some((_, values)) = sections.last_mut()
            && !trimmed.is_empty()
        {
            values.push(line);
        }
    }
    sections
}

fn is_table(values: &[&str]) -> bool {
    values.len() >= 2 && values[0].starts_with('\t')
}

fn parse_data_info(path: &Path, values: &[&str]) -> Result<Vec<DataInfo>, LoadError> {
    let Some((titles, rows)) = values.split_first() else {
        return Ok(Vec::new());
    };
    let titles: Vec<String> = titles
        .split('\t')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let column = |name: &str| {
        titles
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| LoadError::malformed(path, format!("DATA_INFO lacks a '{name}' column")))
    };
    let (name_col, unit_col, dir_col) = (column("name")?, column("unit")?, column("direction")?);

    rows.iter()
        .map(|row| {
            let fields: Vec<&str> = row
                .split('\t')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .collect();
            let field = |index: usize| {
                fields
                    .get(index)
                    .copied()
                    .ok_or_else(|| LoadError::malformed(path, format!("short DATA_INFO row '{}'", row.trim())))
            };
            Ok(DataInfo {
                name: field(name_col)?.to_string(),
                unit: field(unit_col)?.to_string(),
                both_directions: field(dir_col)?.eq_ignore_ascii_case("both"),
            })
        })
        .collect()
}
