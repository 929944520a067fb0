//! Whole-store behaviour across serialization.

use chrono::{TimeZone, Utc};
use spm_model::{DataId, FileFingerprint, FileKind, PropValue, Scope};
use spm_store::{PropertyStore, SortMode, WriteMode, keys, keys::super_keys};

fn populated() -> PropertyStore {
    let mut store = PropertyStore::new();
    for (name, size, secs) in [("a.sxm", 100, 1000), ("b.dat", 50, 2000), ("c.dat", 70, 1500)] {
        store.add_record(&FileFingerprint::new(
            DataId::new(name).unwrap(),
            size,
            Utc.timestamp_opt(secs, 0).unwrap(),
        ));
    }
    store.create_super_properties();
    store.populate_all_defaults();
    store.resort_by_time();
    store
}

#[test]
fn nested_values_survive_json() {
    let mut store = populated();
    store.add_tag("a.sxm", "gold");
    store.set_liked("b.dat", true);
    store.write_data(
        "b.dat",
        keys::CALC_OPTIONS,
        PropValue::List(vec![PropValue::Bool(true), PropValue::Float(9e-10)]),
        WriteMode::UPDATE,
    );
    store.write(
        Scope::Stitch("a.sxm+c.dat"),
        FileFingerprint::KEY_MODIFIED,
        Utc.timestamp_opt(42, 0).unwrap(),
        WriteMode::CREATE_RECORD,
    );

    let json = serde_json::to_string(&store).unwrap();
    let back: PropertyStore = serde_json::from_str(&json).unwrap();

    assert_eq!(back, store);
    assert_eq!(back.ids(), store.ids());
    assert_eq!(back.tags("a.sxm"), vec!["gold"]);
    assert!(back.is_liked("b.dat"));
    assert_eq!(
        back.get(Scope::Stitch("a.sxm+c.dat"), FileFingerprint::KEY_MODIFIED)
            .and_then(PropValue::as_time),
        Some(Utc.timestamp_opt(42, 0).unwrap())
    );
}

#[test]
fn defaults_cover_every_declared_key() {
    let store = populated();
    for key in super_keys::ALL {
        assert!(store.get_super(key).is_some(), "missing super key {key}");
    }
    for key in keys::SCAN_KEYS {
        assert_eq!(store.get_data("a.sxm", key), Some(&PropValue::Null));
        assert!(store.get_data("b.dat", key).is_none());
    }
    for key in keys::SPECTRUM_KEYS {
        assert_eq!(store.get_data("c.dat", key), Some(&PropValue::Null));
    }
    assert_eq!(store.ids_of_kind(FileKind::Spectrum).len(), 2);
}

#[test]
fn time_order_is_kept_after_reload() {
    let store = populated();
    let names: Vec<String> = store.ids().iter().map(DataId::to_string).collect();
    assert_eq!(names, vec!["b.dat", "c.dat", "a.sxm"]);

    let back: PropertyStore = serde_json::from_value(serde_json::to_value(&store).unwrap()).unwrap();
    assert_eq!(back.sorted_ids(&SortMode::TimeInverse), store.ids());
    assert_eq!(back.ids(), store.ids());
}
