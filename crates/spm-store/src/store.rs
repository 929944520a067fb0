//! The layered property store and its read/write contract.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spm_model::{DataId, FileFingerprint, FileKind, Layer, PropValue, Scope};
use tracing::{debug, warn};

use crate::dirty::DirtyTracker;
use crate::outcome::{Refusal, WriteMode, WriteOutcome};

/// Properties of one record, in insertion order.
pub type Record = IndexMap<String, PropValue>;

/// Per-file, global, link and aggregate properties of one browsed directory.
///
/// Reads never fail: a missing record or key is logged and returns `None`.
/// Writes report a [`WriteOutcome`]; refused writes change nothing. Every
/// successful write marks the store dirty.
///
/// The iteration order of the per-file layer is the fallback display order
/// and is preserved through snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyStore {
    #[serde(rename = "data_prop")]
    data: IndexMap<DataId, Record>,
    #[serde(rename = "super")]
    super_props: Record,
    link: Record,
    stitch: IndexMap<String, Record>,
    #[serde(skip)]
    dirty: DirtyTracker,
}

impl PartialEq for PropertyStore {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.super_props == other.super_props
            && self.link == other.link
            && self.stitch == other.stitch
    }
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Dirty state ===

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn dirty_mut(&mut self) -> &mut DirtyTracker {
        &mut self.dirty
    }

    // === Reads ===

    /// Value of `key` in `scope`, or `None` on a miss.
    pub fn get(&self, scope: Scope<'_>, key: &str) -> Option<&PropValue> {
        let record = match scope {
            Scope::Data(id) => self.data.get(id),
            Scope::Stitch(id) => self.stitch.get(id),
            Scope::Super => Some(&self.super_props),
            Scope::Link => Some(&self.link),
        };
        let Some(record) = record else {
            debug!(%scope, key, "miss: no such record");
            return None;
        };
        let value = record.get(key);
        if value.is_none() {
            debug!(%scope, key, "miss: no such property");
        }
        value
    }

    /// Per-file property shorthand.
    pub fn get_data(&self, id: &str, key: &str) -> Option<&PropValue> {
        self.get(Scope::Data(id), key)
    }

    pub fn get_super(&self, key: &str) -> Option<&PropValue> {
        self.get(Scope::Super, key)
    }

    pub fn get_link(&self, key: &str) -> Option<&PropValue> {
        self.get(Scope::Link, key)
    }

    /// All properties of one per-file record.
    pub fn record(&self, id: &str) -> Option<&Record> {
        self.data.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    /// Per-file record ids in store order.
    pub fn ids(&self) -> Vec<DataId> {
        self.data.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Kind of a record, from its recorded extension.
    pub fn kind_of(&self, id: &str) -> Option<FileKind> {
        self.data
            .get(id)?
            .get(FileFingerprint::KEY_EXTENSION)?
            .as_str()
            .and_then(FileKind::from_extension)
    }

    /// Ids whose recorded extension matches `kind`, in store order.
    pub fn ids_of_kind(&self, kind: FileKind) -> Vec<DataId> {
        let ids: Vec<DataId> = self
            .data
            .keys()
            .filter(|id| self.kind_of(id.as_str()) == Some(kind))
            .cloned()
            .collect();
        if ids.is_empty() {
            debug!(%kind, "no records of this kind");
        }
        ids
    }

    /// Recorded fingerprints in store order.
    ///
    /// Records with incomplete meta properties are skipped with a warning.
    pub fn fingerprints(&self) -> Vec<FileFingerprint> {
        self.data
            .iter()
            .filter_map(|(id, record)| {
                let fingerprint = FileFingerprint::from_props(id, |key| record.get(key));
                if fingerprint.is_none() {
                    warn!(data_id = %id, "record lacks a complete fingerprint");
                }
                fingerprint
            })
            .collect()
    }

    pub fn link_names(&self) -> impl Iterator<Item = &str> {
        self.link.keys().map(String::as_str)
    }

    /// `proposed` if no link property has that name, else the first free
    /// `proposed_1`, `proposed_2`, ...
    pub fn unused_link_name(&self, proposed: &str) -> String {
        if !self.link.contains_key(proposed) {
            return proposed.to_string();
        }
        (1..)
            .map(|i| format!("{proposed}_{i}"))
            .find(|name| !self.link.contains_key(name))
            .unwrap_or_else(|| proposed.to_string())
    }

    // === Writes ===

    /// Writes `value` under `key` in `scope`.
    ///
    /// With `mode.create_id`, a stitch scope gets a fresh record; asking to
    /// create a record that already exists refuses the whole write. A new
    /// record accepts its first key regardless of `mode.create_key`.
    ///
    /// Per-file records always start with their meta properties, so
    /// `create_id` on the data layer is refused; use
    /// [`add_record`](Self::add_record).
    pub fn write(
        &mut self,
        scope: Scope<'_>,
        key: &str,
        value: impl Into<PropValue>,
        mode: WriteMode,
    ) -> WriteOutcome {
        let outcome = self.write_inner(scope, key, value.into(), mode);
        match &outcome {
            WriteOutcome::Refused(refusal) => warn!(%scope, key, %refusal, "write refused"),
            _ => self.dirty.mark_dirty(),
        }
        outcome
    }

    /// Per-file write shorthand.
    pub fn write_data(
        &mut self,
        id: &str,
        key: &str,
        value: impl Into<PropValue>,
        mode: WriteMode,
    ) -> WriteOutcome {
        self.write(Scope::Data(id), key, value, mode)
    }

    pub fn write_super(&mut self, key: &str, value: impl Into<PropValue>, mode: WriteMode) -> WriteOutcome {
        self.write(Scope::Super, key, value, mode)
    }

    pub fn write_link(&mut self, key: &str, value: impl Into<PropValue>, mode: WriteMode) -> WriteOutcome {
        self.write(Scope::Link, key, value, mode)
    }

    fn write_inner(
        &mut self,
        scope: Scope<'_>,
        key: &str,
        value: PropValue,
        mode: WriteMode,
    ) -> WriteOutcome {
        let layer = scope.layer();
        let mut new_record = false;

        if mode.create_id {
            match scope {
                Scope::Data(id) => {
                    if self.data.contains_key(id) {
                        return duplicate(layer, id);
                    }
                    return WriteOutcome::Refused(Refusal::NeedsFingerprint(id.to_string()));
                }
                Scope::Stitch(id) => {
                    if self.stitch.contains_key(id) {
                        return duplicate(layer, id);
                    }
                    self.stitch.insert(id.to_string(), Record::new());
                    new_record = true;
                }
                Scope::Super | Scope::Link => {
                    debug!(%layer, "create_id ignored for a global layer");
                }
            }
        }

        let record = match scope {
            Scope::Data(id) => self.data.get_mut(id),
            Scope::Stitch(id) => self.stitch.get_mut(id),
            Scope::Super => Some(&mut self.super_props),
            Scope::Link => Some(&mut self.link),
        };
        let Some(record) = record else {
            return WriteOutcome::Refused(Refusal::UnknownId {
                layer,
                id: scope.id().unwrap_or_default().to_string(),
            });
        };

        match record.get_mut(key) {
            Some(slot) => {
                *slot = value;
                WriteOutcome::Updated
            }
            None if mode.create_key || new_record => {
                record.insert(key.to_string(), value);
                WriteOutcome::Created
            }
            None => WriteOutcome::Refused(Refusal::UnknownKey {
                scope: scope.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Creates a per-file record holding the four meta properties.
    ///
    /// Refused if the record already exists; the recorded fingerprint is
    /// never overwritten this way.
    pub fn add_record(&mut self, fingerprint: &FileFingerprint) -> WriteOutcome {
        let id = fingerprint.filename.as_str();
        if self.data.contains_key(id) {
            let outcome = duplicate(Layer::Data, id);
            if let Some(refusal) = outcome.refusal() {
                warn!(data_id = id, %refusal, "write refused");
            }
            return outcome;
        }
        let record: Record = fingerprint
            .to_props()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.data.insert(fingerprint.filename.clone(), record);
        self.dirty.mark_dirty();
        WriteOutcome::Created
    }

    /// Reorders the per-file layer to follow `order`.
    ///
    /// Ids missing from `order` keep their relative order after the listed
    /// ones; unknown ids in `order` are ignored.
    pub(crate) fn reorder(&mut self, order: &[DataId]) {
        let positions: HashMap<&DataId, usize> =
            order.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let position = |id: &DataId| positions.get(id).copied().unwrap_or(usize::MAX);
        self.data.sort_by(|a, _, b, _| position(a).cmp(&position(b)));
    }

    pub(crate) fn super_record(&self) -> &Record {
        &self.super_props
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = (&DataId, &Record)> {
        self.data.iter()
    }
}

fn duplicate(layer: Layer, id: &str) -> WriteOutcome {
    WriteOutcome::Refused(Refusal::DuplicateId {
        layer,
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fingerprint(name: &str, size: u64, secs: i64) -> FileFingerprint {
        FileFingerprint::new(
            DataId::new(name).unwrap(),
            size,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn reads_of_missing_ids_and_keys_are_misses() {
        let mut store = PropertyStore::new();
        store.add_record(&fingerprint("a.sxm", 100, 1000));
        assert!(store.get_data("b.sxm", "liked").is_none());
        assert!(store.get_data("a.sxm", "liked").is_none());
        assert!(store.get_super("anything").is_none());
        assert_eq!(
            store.get_data("a.sxm", FileFingerprint::KEY_SIZE),
            Some(&PropValue::Int(100))
        );
    }

    #[test]
    fn write_to_unknown_id_is_refused_and_stays_clean() {
        let mut store = PropertyStore::new();
        let outcome = store.write_data("ghost.dat", "liked", true, WriteMode::CREATE_KEY);
        assert!(matches!(
            outcome,
            WriteOutcome::Refused(Refusal::UnknownId { layer: Layer::Data, .. })
        ));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn unknown_key_needs_create_key() {
        let mut store = PropertyStore::new();
        store.add_record(&fingerprint("a.sxm", 100, 1000));
        store.dirty_mut().save_complete();

        let refused = store.write_data("a.sxm", "liked", true, WriteMode::UPDATE);
        assert!(matches!(refused, WriteOutcome::Refused(Refusal::UnknownKey { .. })));
        assert!(!store.is_dirty());

        assert_eq!(
            store.write_data("a.sxm", "liked", true, WriteMode::CREATE_KEY),
            WriteOutcome::Created
        );
        assert_eq!(
            store.write_data("a.sxm", "liked", false, WriteMode::UPDATE),
            WriteOutcome::Updated
        );
        assert_eq!(store.get_data("a.sxm", "liked"), Some(&PropValue::Bool(false)));
        assert!(store.is_dirty());
    }

    #[test]
    fn duplicate_record_creation_is_a_no_op() {
        let mut store = PropertyStore::new();
        store.add_record(&fingerprint("a.sxm", 100, 1000));
        store.write_data("a.sxm", "liked", true, WriteMode::CREATE_KEY);
        let outcome = store.write_data("a.sxm", "liked", false, WriteMode::CREATE_RECORD);
        assert!(matches!(
            outcome,
            WriteOutcome::Refused(Refusal::DuplicateId { .. })
        ));
        assert_eq!(store.get_data("a.sxm", "liked"), Some(&PropValue::Bool(true)));
        assert!(!store.add_record(&fingerprint("a.sxm", 1, 1)).is_success());
    }

    #[test]
    fn data_records_start_from_a_fingerprint() {
        let mut store = PropertyStore::new();
        let outcome = store.write_data("c.dat", "liked", true, WriteMode::CREATE_RECORD);
        assert_eq!(outcome, WriteOutcome::Refused(Refusal::NeedsFingerprint("c.dat".into())));
        assert!(store.is_empty());
        assert!(!store.is_dirty());

        let fp = fingerprint("c.dat", 10, 3000);
        assert_eq!(store.add_record(&fp), WriteOutcome::Created);
        assert_eq!(store.fingerprints(), vec![fp]);
        let keys: Vec<&str> = store.record("c.dat").unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn global_layers_ignore_create_id() {
        let mut store = PropertyStore::new();
        assert_eq!(
            store.write(Scope::Super, "sort_mode", "Name", WriteMode::CREATE_RECORD),
            WriteOutcome::Created
        );
        assert_eq!(
            store.write(Scope::Link, "figure", "fig-1", WriteMode::UPDATE),
            WriteOutcome::Refused(Refusal::UnknownKey {
                scope: "link".into(),
                key: "figure".into()
            })
        );
    }

    #[test]
    fn stitch_layer_is_keyed() {
        let mut store = PropertyStore::new();
        let scope = Scope::Stitch("a.sxm+b.sxm");
        assert!(!store.write(scope, "file_modified_date", 1i64, WriteMode::UPDATE).is_success());
        assert!(store.write(scope, "file_modified_date", 1i64, WriteMode::CREATE_RECORD).is_success());
        assert_eq!(store.get(scope, "file_modified_date"), Some(&PropValue::Int(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn reorder_follows_the_listed_ids() {
        let mut store = PropertyStore::new();
        for (name, secs) in [("a.sxm", 1), ("b.dat", 2), ("c.dat", 3), ("d.sxm", 4)] {
            store.add_record(&fingerprint(name, 1, secs));
        }
        let order: Vec<DataId> = ["c.dat", "ghost.dat", "a.sxm"]
            .into_iter()
            .map(|name| DataId::new(name).unwrap())
            .collect();
        store.reorder(&order);
        let ids: Vec<String> = store.ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["c.dat", "a.sxm", "b.dat", "d.sxm"]);
    }

    #[test]
    fn unused_link_names_count_up() {
        let mut store = PropertyStore::new();
        assert_eq!(store.unused_link_name("fig"), "fig");
        store.write_link("fig", "x", WriteMode::CREATE_KEY);
        store.write_link("fig_1", "y", WriteMode::CREATE_KEY);
        assert_eq!(store.unused_link_name("fig"), "fig_2");
    }

    #[test]
    fn fingerprints_round_trip_through_records() {
        let mut store = PropertyStore::new();
        let fp = fingerprint("b.dat", 50, 2000);
        store.add_record(&fp);
        assert_eq!(store.fingerprints(), vec![fp]);
        assert_eq!(store.ids_of_kind(FileKind::Spectrum), vec![DataId::new("b.dat").unwrap()]);
        assert!(store.ids_of_kind(FileKind::Scan).is_empty());
    }

    #[test]
    fn serializes_layers_by_name() {
        let mut store = PropertyStore::new();
        store.add_record(&fingerprint("a.sxm", 100, 1000));
        store.write_super("sort_mode", PropValue::Null, WriteMode::CREATE_KEY);
        let json = serde_json::to_value(&store).unwrap();
        assert!(json["data_prop"]["a.sxm"]["file_size"].is_object());
        assert!(json["super"]["sort_mode"].is_object());
        assert!(json["link"].as_object().unwrap().is_empty());

        let back: PropertyStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
        assert!(!back.is_dirty());
    }
}
