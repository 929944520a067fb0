//! Declared properties and their default values.

use spm_model::{FileKind, PropValue};
use tracing::debug;

use crate::keys::{self, super_keys};
use crate::outcome::WriteMode;
use crate::store::PropertyStore;

/// Properties every record gets, with their defaults.
pub fn shared_defaults() -> Vec<(&'static str, PropValue)> {
    vec![
        (keys::LIKED, PropValue::Bool(false)),
        (keys::GROUP, PropValue::Null),
        (keys::CHECKED, PropValue::Bool(false)),
        (keys::TAGS, PropValue::List(Vec::new())),
        (keys::CHANNEL_NAMES, PropValue::List(Vec::new())),
        (keys::PRERENDER, PropValue::Null),
    ]
}

/// Type-specific properties; all start out `Null`.
pub fn kind_keys(kind: FileKind) -> &'static [&'static str] {
    match kind {
        FileKind::Scan => &keys::SCAN_KEYS,
        FileKind::Spectrum => &keys::SPECTRUM_KEYS,
    }
}

impl PropertyStore {
    /// Adds the declared super properties that are not present yet.
    pub fn create_super_properties(&mut self) {
        for key in super_keys::ALL {
            if self.get_super_silent(key).is_none() {
                self.write_super(key, PropValue::Null, WriteMode::CREATE_KEY);
            }
        }
    }

    /// Gives every record of `kind` the declared properties it lacks.
    ///
    /// Existing values are left alone. Returns the number of properties
    /// written.
    pub fn populate_defaults(&mut self, kind: FileKind) -> usize {
        let mut declared = shared_defaults();
        declared.extend(kind_keys(kind).iter().map(|key| (*key, PropValue::Null)));

        let mut written = 0;
        for id in self.ids_of_kind(kind) {
            for (key, value) in &declared {
                let present = self
                    .record(id.as_str())
                    .is_some_and(|record| record.contains_key(*key));
                if !present
                    && self
                        .write_data(id.as_str(), key, value.clone(), WriteMode::CREATE_KEY)
                        .is_success()
                {
                    written += 1;
                }
            }
        }
        debug!(%kind, written, "populated default properties");
        written
    }

    /// [`populate_defaults`](Self::populate_defaults) for both kinds.
    pub fn populate_all_defaults(&mut self) -> usize {
        FileKind::ALL
            .into_iter()
            .map(|kind| self.populate_defaults(kind))
            .sum()
    }

    fn get_super_silent(&self, key: &str) -> Option<&PropValue> {
        self.super_record().get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use spm_model::{DataId, FileFingerprint};

    fn store_with(names: &[&str]) -> PropertyStore {
        let mut store = PropertyStore::new();
        for name in names {
            store.add_record(&FileFingerprint::new(
                DataId::new(*name).unwrap(),
                1,
                Utc.timestamp_opt(1, 0).unwrap(),
            ));
        }
        store
    }

    #[test]
    fn super_properties_are_created_once() {
        let mut store = PropertyStore::new();
        store.create_super_properties();
        for key in super_keys::ALL {
            assert_eq!(store.get_super(key), Some(&PropValue::Null));
        }
        store.write_super(super_keys::SORT_MODE, "Name", WriteMode::UPDATE);
        store.create_super_properties();
        assert_eq!(
            store.get_super(super_keys::SORT_MODE),
            Some(&PropValue::Text("Name".into()))
        );
    }

    #[test]
    fn defaults_follow_the_record_kind() {
        let mut store = store_with(&["a.sxm", "b.dat"]);
        let written = store.populate_all_defaults();
        assert_eq!(written, 2 * 6 + keys::SCAN_KEYS.len() + keys::SPECTRUM_KEYS.len());

        assert_eq!(store.get_data("a.sxm", keys::LIKED), Some(&PropValue::Bool(false)));
        assert_eq!(store.get_data("a.sxm", keys::FCHANNEL), Some(&PropValue::Null));
        assert!(store.get_data("a.sxm", keys::FXCHANNEL).is_none());
        assert_eq!(store.get_data("b.dat", keys::TAGS), Some(&PropValue::List(vec![])));
        assert!(store.get_data("b.dat", keys::FCHANNEL).is_none());
    }

    #[test]
    fn defaults_never_overwrite() {
        let mut store = store_with(&["a.sxm"]);
        store.populate_defaults(FileKind::Scan);
        store.write_data("a.sxm", keys::LIKED, true, WriteMode::UPDATE);
        assert_eq!(store.populate_defaults(FileKind::Scan), 0);
        assert_eq!(store.get_data("a.sxm", keys::LIKED), Some(&PropValue::Bool(true)));
    }
}
