use std::fs;

use chrono::{TimeZone, Utc};
use serde_json::json;

use raid_attendance::model::Snapshot;
use raid_attendance::normalize::normalize;
use raid_attendance::persist::{SnapshotStore, SNAPSHOT_KEY};

fn snapshot() -> Snapshot {
    let dataset = normalize(&json!({
        "nights": ["2025-01-02", "2025-01-09"],
        "rows": [
            { "name": "Alice", "attended": 2, "possible": 2, "lastSeen": "2025-01-09" },
            { "name": "Bob", "attended": 1, "possible": 2, "present": ["2025-01-02"] }
        ]
    }))
    .expect("should normalize");
    Snapshot {
        dataset,
        captured_at: Utc.with_ymd_and_hms(2025, 1, 10, 20, 30, 0).unwrap(),
    }
}

#[test]
fn empty_store_loads_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    assert!(store.load().is_none());
}

#[test]
fn saved_snapshot_loads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let snap = snapshot();
    store.save(&snap);

    let path = store.path().expect("path");
    assert!(path.ends_with(format!("{SNAPSHOT_KEY}.json")));
    assert!(!path.with_extension("json.tmp").exists());
    assert_eq!(store.load(), Some(snap));
}

#[test]
fn save_overwrites_the_single_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let first = snapshot();
    store.save(&first);

    let mut second = snapshot();
    second.dataset.records.truncate(1);
    second.captured_at = Utc.with_ymd_and_hms(2025, 1, 17, 20, 30, 0).unwrap();
    store.save(&second);

    assert_eq!(store.load(), Some(second));
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 1);
}

#[test]
fn clear_erases_snapshot_and_is_repeatable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    store.save(&snapshot());
    store.clear();
    assert!(store.load().is_none());
    store.clear();
    assert!(store.load().is_none());
}

#[test]
fn corrupt_or_mismatched_files_read_as_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let path = store.path().expect("path").to_path_buf();

    fs::write(&path, "{ not json").expect("write");
    assert!(store.load().is_none());

    fs::write(&path, r#"{"version":1,"snapshot":{}}"#).expect("write");
    assert!(store.load().is_none());

    fs::write(&path, r#"{"nights":[],"rows":[],"updatedAt":"2025-01-01"}"#).expect("write");
    assert!(store.load().is_none());
}

#[test]
fn loaded_percentages_are_clamped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let mut snap = snapshot();
    snap.dataset.records[0].percentage = 240;
    store.save(&snap);

    let loaded = store.load().expect("snapshot");
    assert_eq!(loaded.dataset.records[0].percentage, 100);
}

#[test]
fn unwritable_location_degrades_silently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("file");
    fs::write(&blocker, "x").expect("write");
    // Parent "directory" is a regular file, so every write fails.
    let store = SnapshotStore::new(blocker.join("nested"));
    store.save(&snapshot());
    assert!(store.load().is_none());
    store.clear();
}

#[test]
fn disabled_store_keeps_nothing() {
    let store = SnapshotStore::disabled();
    store.save(&snapshot());
    assert!(store.load().is_none());
    assert!(store.path().is_none());
}
