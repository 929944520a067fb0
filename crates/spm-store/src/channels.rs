//! Favourite-channel heuristic and channel-name bookkeeping.

use spm_model::{DataId, FileKind, LoadedFile, PropValue, header_keys};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::LoadedCache;
use crate::keys;
use crate::outcome::WriteMode;
use crate::store::PropertyStore;

/// Channels a record opens with by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Favorite {
    Scan { channel: String },
    Spectrum { x: String, y: String },
}

/// A per-record problem in a batch pass. The pass carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordIssue {
    #[error("{0} is not loaded")]
    NotLoaded(DataId),
    #[error("{0} has no channels")]
    NoChannels(DataId),
    #[error("{0} has no recognised file kind")]
    UnknownKind(DataId),
}

/// Picks the default channel(s) of a loaded file.
///
/// Scans prefer `z` while the z-controller is on, then `dIdV` while the
/// lock-in runs, then `df` while the oscillation controller drives the tip,
/// then the first channel. Spectra prefer `V` against `dIdV`, then the first
/// two channels, then the only channel against itself.
pub fn favorite_channel(file: &LoadedFile) -> Option<Favorite> {
    let first = file.channels.first()?;
    let favorite = match file.kind {
        FileKind::Scan => {
            let feedback_on = file.get_param(header_keys::FEEDBACK_ON) == Some("1");
            let lockin_on = file.get_param(header_keys::LOCKIN_STATUS) == Some("ON");
            let oscillation_on = file.get_param(header_keys::OSCILLATION_OUTPUT_OFF) == Some("FALSE");
            let channel = [
                (feedback_on, "z"),
                (lockin_on, "dIdV"),
                (oscillation_on, "df"),
            ]
            .into_iter()
            .find(|(enabled, name)| *enabled && file.has_channel(name))
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| first.clone());
            Favorite::Scan { channel }
        }
        FileKind::Spectrum => {
            if file.has_channel("V") && file.has_channel("dIdV") {
                Favorite::Spectrum {
                    x: "V".to_string(),
                    y: "dIdV".to_string(),
                }
            } else {
                let second = file.channels.get(1).unwrap_or(first);
                Favorite::Spectrum {
                    x: first.clone(),
                    y: second.clone(),
                }
            }
        }
    };
    Some(favorite)
}

impl PropertyStore {
    /// Writes the favourite channel(s) of one record from its loaded content.
    pub fn pick_favorite_channel(
        &mut self,
        id: &DataId,
        cache: &LoadedCache,
    ) -> Result<Favorite, RecordIssue> {
        if self.kind_of(id.as_str()).is_none() {
            return Err(RecordIssue::UnknownKind(id.clone()));
        }
        let file = cache
            .get(id.as_str())
            .ok_or_else(|| RecordIssue::NotLoaded(id.clone()))?;
        let favorite = favorite_channel(file).ok_or_else(|| RecordIssue::NoChannels(id.clone()))?;
        let id = id.as_str();
        match &favorite {
            Favorite::Scan { channel } => {
                self.write_data(id, keys::FCHANNEL, channel.as_str(), WriteMode::CREATE_KEY);
            }
            Favorite::Spectrum { x, y } => {
                self.write_data(id, keys::FXCHANNEL, x.as_str(), WriteMode::CREATE_KEY);
                self.write_data(id, keys::FYCHANNEL, y.as_str(), WriteMode::CREATE_KEY);
            }
        }
        debug!(data_id = id, ?favorite, "favourite channel picked");
        Ok(favorite)
    }

    /// Runs [`pick_favorite_channel`](Self::pick_favorite_channel) for every
    /// record, collecting the records it could not handle.
    pub fn pick_favorite_channels(&mut self, cache: &LoadedCache) -> Vec<RecordIssue> {
        let mut issues = Vec::new();
        for id in self.ids() {
            if let Err(issue) = self.pick_favorite_channel(&id, cache) {
                warn!(%issue, "favourite channel not picked");
                issues.push(issue);
            }
        }
        issues
    }

    /// Records every record's channel list from its loaded content.
    pub fn record_channel_names(&mut self, cache: &LoadedCache) -> Vec<RecordIssue> {
        let mut issues = Vec::new();
        for id in self.ids() {
            match cache.get(id.as_str()) {
                Some(file) => {
                    self.write_data(
                        id.as_str(),
                        keys::CHANNEL_NAMES,
                        PropValue::text_list(file.channels.iter().cloned()),
                        WriteMode::CREATE_KEY,
                    );
                }
                None => {
                    let issue = RecordIssue::NotLoaded(id);
                    warn!(%issue, "channel names not recorded");
                    issues.push(issue);
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use spm_model::{ChannelData, FileFingerprint};

    fn scan(header: &[(&str, &str)], channels: &[&str]) -> LoadedFile {
        let mut file = LoadedFile::new(FileKind::Scan);
        for (key, value) in header {
            file.header.insert(key.to_string(), value.to_string());
        }
        for channel in channels {
            file.insert_channel(*channel, ChannelData::curve("m", vec![]));
        }
        file
    }

    fn spectrum(channels: &[&str]) -> LoadedFile {
        let mut file = LoadedFile::new(FileKind::Spectrum);
        for channel in channels {
            file.insert_channel(*channel, ChannelData::curve("V", vec![]));
        }
        file
    }

    #[test]
    fn feedback_prefers_height() {
        let file = scan(
            &[(header_keys::FEEDBACK_ON, "1"), (header_keys::LOCKIN_STATUS, "ON")],
            &["I", "dIdV", "z"],
        );
        assert_eq!(favorite_channel(&file), Some(Favorite::Scan { channel: "z".into() }));
    }

    #[test]
    fn lockin_without_feedback_prefers_conductance() {
        let file = scan(
            &[(header_keys::FEEDBACK_ON, "0"), (header_keys::LOCKIN_STATUS, "ON")],
            &["z", "I", "dIdV"],
        );
        assert_eq!(favorite_channel(&file), Some(Favorite::Scan { channel: "dIdV".into() }));
    }

    #[test]
    fn oscillation_then_first_channel() {
        let file = scan(
            &[(header_keys::OSCILLATION_OUTPUT_OFF, "FALSE")],
            &["A", "df"],
        );
        assert_eq!(favorite_channel(&file), Some(Favorite::Scan { channel: "df".into() }));
        let file = scan(&[], &["I", "z"]);
        assert_eq!(favorite_channel(&file), Some(Favorite::Scan { channel: "I".into() }));
        assert_eq!(favorite_channel(&scan(&[], &[])), None);
    }

    #[test]
    fn spectrum_pairs() {
        let pair = |x: &str, y: &str| Some(Favorite::Spectrum { x: x.into(), y: y.into() });
        assert_eq!(favorite_channel(&spectrum(&["I", "dIdV", "V"])), pair("V", "dIdV"));
        assert_eq!(favorite_channel(&spectrum(&["V", "I"])), pair("V", "I"));
        assert_eq!(favorite_channel(&spectrum(&["z"])), pair("z", "z"));
    }

    #[test]
    fn batch_reports_unloaded_records_and_continues() {
        let mut store = PropertyStore::new();
        for name in ["a.sxm", "b.dat"] {
            store.add_record(&FileFingerprint::new(
                DataId::new(name).unwrap(),
                1,
                Utc.timestamp_opt(1, 0).unwrap(),
            ));
        }
        store.populate_all_defaults();
        let mut cache = LoadedCache::new();
        cache.insert(DataId::new("b.dat").unwrap(), spectrum(&["V", "dIdV"]));

        let issues = store.pick_favorite_channels(&cache);
        assert_eq!(issues, vec![RecordIssue::NotLoaded(DataId::new("a.sxm").unwrap())]);
        assert_eq!(
            store.get_data("b.dat", keys::FYCHANNEL),
            Some(&PropValue::Text("dIdV".into()))
        );

        let issues = store.record_channel_names(&cache);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            store.get_data("b.dat", keys::CHANNEL_NAMES),
            Some(&PropValue::text_list(["V", "dIdV"]))
        );
    }
}
