//! Record ordering: the stored time order and the browser's sort views.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use spm_model::{DataId, FileFingerprint, PropValue};
use tracing::debug;

use crate::keys::{self, super_keys};
use crate::outcome::WriteMode;
use crate::store::PropertyStore;

/// How the browser lists records.
///
/// The filtering modes (`SelectedTags`, `Checked`, `Liked`, `NotLiked`)
/// keep store order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    Name,
    NameInverse,
    /// Oldest first.
    Time,
    /// Newest first.
    #[default]
    TimeInverse,
    /// Grouped by tag, tags alphabetical; untagged records are left out.
    Tags,
    TagsInverse,
    /// Records carrying any of the tags.
    SelectedTags(BTreeSet<String>),
    Checked,
    Liked,
    NotLiked,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Name => "Name",
            SortMode::NameInverse => "Name Inverse",
            SortMode::Time => "Time",
            SortMode::TimeInverse => "Time Inverse",
            SortMode::Tags => "Tags",
            SortMode::TagsInverse => "Tags Inverse",
            SortMode::SelectedTags(_) => "Selected Tags",
            SortMode::Checked => "Checked",
            SortMode::Liked => "Liked",
            SortMode::NotLiked => "Not Liked",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortMode {
    type Err = String;

    /// Parses the labels; `Selected Tags` starts with an empty tag set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalised.as_str() {
            "name" => Ok(SortMode::Name),
            "name inverse" => Ok(SortMode::NameInverse),
            "time" => Ok(SortMode::Time),
            "time inverse" => Ok(SortMode::TimeInverse),
            "tags" => Ok(SortMode::Tags),
            "tags inverse" => Ok(SortMode::TagsInverse),
            "selected tags" => Ok(SortMode::SelectedTags(BTreeSet::new())),
            "checked" => Ok(SortMode::Checked),
            "liked" => Ok(SortMode::Liked),
            "not liked" | "disliked" => Ok(SortMode::NotLiked),
            _ => Err(format!("Unknown sort mode: {s}")),
        }
    }
}

impl PropertyStore {
    /// Ids ordered newest-modified first.
    ///
    /// Equal times keep their current relative order, so recomputing the
    /// order is idempotent. Records without a modified time go last.
    pub fn time_sorted_ids(&self) -> Vec<DataId> {
        let mut entries: Vec<(&DataId, Option<chrono::DateTime<chrono::Utc>>)> = self
            .records()
            .map(|(id, record)| {
                let modified = record
                    .get(FileFingerprint::KEY_MODIFIED)
                    .and_then(PropValue::as_time);
                (id, modified)
            })
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Recomputes the time order, records it in `data_id_time_sorted` and
    /// reorders the per-file layer to match.
    pub fn resort_by_time(&mut self) -> Vec<DataId> {
        let order = self.time_sorted_ids();
        self.write_super(
            super_keys::DATA_ID_TIME_SORTED,
            PropValue::text_list(order.iter().map(DataId::to_string)),
            WriteMode::CREATE_KEY,
        );
        self.reorder(&order);
        debug!(records = order.len(), "resorted records by time");
        order
    }

    /// Ids as listed under `mode`. The store itself is not reordered.
    pub fn sorted_ids(&self, mode: &SortMode) -> Vec<DataId> {
        let ids = self.ids();
        match mode {
            SortMode::Name | SortMode::NameInverse => {
                let mut sorted = ids;
                sorted.sort_by(|a, b| self.filename(a).cmp(self.filename(b)));
                if *mode == SortMode::NameInverse {
                    sorted.reverse();
                }
                sorted
            }
            SortMode::Time => {
                let mut sorted = self.time_sorted_ids();
                sorted.reverse();
                sorted
            }
            SortMode::TimeInverse => self.time_sorted_ids(),
            SortMode::Tags | SortMode::TagsInverse => {
                let mut sorted: Vec<DataId> = Vec::new();
                for tag in self.all_tags() {
                    for id in &ids {
                        if !sorted.contains(id) && self.tags(id.as_str()).contains(&tag) {
                            sorted.push(id.clone());
                        }
                    }
                }
                if *mode == SortMode::TagsInverse {
                    sorted.reverse();
                }
                sorted
            }
            SortMode::SelectedTags(selected) => ids
                .into_iter()
                .filter(|id| {
                    self.tags(id.as_str())
                        .iter()
                        .any(|tag| selected.contains(tag))
                })
                .collect(),
            SortMode::Checked => ids
                .into_iter()
                .filter(|id| self.is_checked(id.as_str()))
                .collect(),
            SortMode::Liked => ids
                .into_iter()
                .filter(|id| self.is_liked(id.as_str()))
                .collect(),
            SortMode::NotLiked => ids
                .into_iter()
                .filter(|id| {
                    self.get_data(id.as_str(), keys::LIKED)
                        .and_then(PropValue::as_bool)
                        == Some(false)
                })
                .collect(),
        }
    }

    fn filename<'a>(&'a self, id: &'a DataId) -> &'a str {
        self.get_data(id.as_str(), FileFingerprint::KEY_FILENAME)
            .and_then(PropValue::as_str)
            .unwrap_or(id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn store() -> PropertyStore {
        let mut store = PropertyStore::new();
        for (name, secs) in [("c.sxm", 3000), ("a.sxm", 1000), ("b.dat", 2000)] {
            store.add_record(&FileFingerprint::new(
                DataId::new(name).unwrap(),
                1,
                Utc.timestamp_opt(secs, 0).unwrap(),
            ));
        }
        store.populate_all_defaults();
        store
    }

    fn names(ids: &[DataId]) -> Vec<&str> {
        ids.iter().map(DataId::as_str).collect()
    }

    #[test]
    fn resort_orders_newest_first_and_is_idempotent() {
        let mut store = store();
        let first = store.resort_by_time();
        assert_eq!(names(&first), vec!["c.sxm", "b.dat", "a.sxm"]);
        assert_eq!(store.ids(), first);
        assert_eq!(store.resort_by_time(), first);
        assert_eq!(
            store.get_super(super_keys::DATA_ID_TIME_SORTED),
            Some(&PropValue::text_list(["c.sxm", "b.dat", "a.sxm"]))
        );
    }

    #[test]
    fn equal_times_keep_their_order() {
        let mut store = PropertyStore::new();
        for name in ["x.dat", "y.dat", "z.dat"] {
            store.add_record(&FileFingerprint::new(
                DataId::new(name).unwrap(),
                1,
                Utc.timestamp_opt(5, 0).unwrap(),
            ));
        }
        let once = store.resort_by_time();
        assert_eq!(names(&once), vec!["x.dat", "y.dat", "z.dat"]);
        assert_eq!(store.resort_by_time(), once);
    }

    #[test]
    fn name_and_time_views() {
        let store = store();
        assert_eq!(names(&store.sorted_ids(&SortMode::Name)), vec!["a.sxm", "b.dat", "c.sxm"]);
        assert_eq!(
            names(&store.sorted_ids(&SortMode::NameInverse)),
            vec!["c.sxm", "b.dat", "a.sxm"]
        );
        assert_eq!(names(&store.sorted_ids(&SortMode::Time)), vec!["a.sxm", "b.dat", "c.sxm"]);
        // Views never reorder the store.
        assert_eq!(names(&store.ids()), vec!["c.sxm", "a.sxm", "b.dat"]);
    }

    #[test]
    fn tag_and_flag_views() {
        let mut store = store();
        store.add_tag("a.sxm", "gold");
        store.add_tag("b.dat", "au");
        store.add_tag("c.sxm", "gold");
        store.set_liked("b.dat", true);
        store.set_checked("c.sxm", true);

        assert_eq!(names(&store.sorted_ids(&SortMode::Tags)), vec!["b.dat", "c.sxm", "a.sxm"]);
        assert_eq!(
            names(&store.sorted_ids(&SortMode::TagsInverse)),
            vec!["a.sxm", "c.sxm", "b.dat"]
        );
        let selected = SortMode::SelectedTags(BTreeSet::from(["gold".to_string()]));
        assert_eq!(names(&store.sorted_ids(&selected)), vec!["c.sxm", "a.sxm"]);
        assert_eq!(names(&store.sorted_ids(&SortMode::Liked)), vec!["b.dat"]);
        assert_eq!(names(&store.sorted_ids(&SortMode::NotLiked)), vec!["c.sxm", "a.sxm"]);
        assert_eq!(names(&store.sorted_ids(&SortMode::Checked)), vec!["c.sxm"]);
    }

    #[test]
    fn labels_parse_back() {
        for label in ["Name", "Time Inverse", "Tags Inverse", "Not Liked", "Checked"] {
            assert_eq!(label.parse::<SortMode>().unwrap().label(), label);
        }
        assert_eq!("Disliked".parse::<SortMode>().unwrap(), SortMode::NotLiked);
        assert!("size".parse::<SortMode>().is_err());
    }
}
