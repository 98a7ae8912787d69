//! Integration tests for the survey point store, the scan archive and the
//! blob-store adapters.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use beacon_survey::prelude::*;
use beacon_survey::{ImportSummary, StorageError};
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn home() -> LocationId {
    LocationId::new("home").unwrap()
}

/// Assemble a small real record for `session_id`.
fn session(session_id: &str, minute: u32) -> SurveyRecord {
    let start = Utc.with_ymd_and_hms(2026, 4, 2, 9, minute, 0).unwrap();
    let mut window = CollectionWindow::new(
        "home",
        "point-a",
        session_id,
        start,
        start + Duration::seconds(10),
        Point2::new(120.0, 80.0),
    );
    window.pose = DevicePose::planar(Some(1.2), Some(45.0));
    let mut buffer = SampleBuffer::with_opening_marker();
    for i in 1..=12u64 {
        buffer.push(i * 500, -60 - (i % 4) as i32);
    }
    buffer.close(10_000);
    window.insert_beacon("beacon-1", BeaconCapture::new(buffer));

    let geometry: HashMap<String, BeaconGeometry> = HashMap::new();
    RecordAssembler::default()
        .assemble(&window, &geometry, None)
        .unwrap()
}

fn loaded<S: BlobStore>(blobs: S) -> SurveyPointStore<S> {
    let store = SurveyPointStore::new(blobs);
    store.set_active_location(home()).unwrap();
    store
}

fn session_ids(point: &SurveyPoint) -> Vec<String> {
    point.sessions.iter().map(|s| s.session_id.clone()).collect()
}

/// Blob store whose writes always fail.
#[derive(Default)]
struct BrokenDisk {
    inner: MemoryBlobStore,
}

impl BlobStore for BrokenDisk {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, _bytes: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    fn write_new(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.write(key, bytes)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list(prefix)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Two sessions whose coordinates round to the same key accumulate under one
/// point, in append order.
#[test]
fn nearby_sessions_share_a_point() {
    let store = loaded(MemoryBlobStore::new());
    let k1 = store.add_session(session("s1", 0), 1.004, 2.006).unwrap();
    let k2 = store.add_session(session("s2", 1), 0.996, 2.005).unwrap();

    assert_eq!(k1, "1.00,2.01");
    assert_eq!(k1, k2);
    assert_eq!(store.point_count(), 1);
    let point = store.point_at(1.0, 2.01).unwrap();
    assert_eq!(session_ids(&point), vec!["s1", "s2"]);
    assert_eq!(point.created_iso, "2026-04-02T09:00:00.000Z");
}

/// Coordinates that round apart never share a point.
#[test]
fn distinct_keys_stay_apart() {
    let store = loaded(MemoryBlobStore::new());
    store.add_session(session("s1", 0), 1.004, 2.006).unwrap();
    store.add_session(session("s2", 1), 1.005, 2.004).unwrap();
    assert_eq!(store.point_count(), 2);
    assert!(store.point("1.00,2.01").is_some());
    assert!(store.point("1.01,2.00").is_some());
}

/// Key derivation is half-up and deterministic.
#[test]
fn coordinate_key_determinism() {
    assert_eq!(make_key(3.005, 7.0), "3.01,7.00");
    assert_eq!(make_key(3.005, 7.0), make_key(3.0051, 6.9999));
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

/// exportAll then a replacing import reproduces keys and session IDs.
#[test]
fn export_then_replace_round_trips() {
    let source = loaded(MemoryBlobStore::new());
    source.add_session(session("s1", 0), 1.0, 1.0).unwrap();
    source.add_session(session("s2", 1), 1.0, 1.0).unwrap();
    source.add_session(session("s3", 2), 4.25, -3.5).unwrap();
    let exported = source.export_all().unwrap();

    let target = loaded(MemoryBlobStore::new());
    target.add_session(session("stale", 3), 9.0, 9.0).unwrap();
    target.import_merge(exported.clone(), false).unwrap();

    let reimported = target.export_all().unwrap();
    let keys = |points: &[SurveyPoint]| -> Vec<String> {
        points.iter().map(|p| p.coordinate_key.clone()).collect()
    };
    assert_eq!(keys(&reimported), keys(&exported));
    for (a, b) in reimported.iter().zip(&exported) {
        assert_eq!(session_ids(a), session_ids(b));
    }
    assert!(target.point("9.00,9.00").is_none());
}

/// Merging the same export twice adds nothing the second time.
#[test]
fn merge_is_idempotent() {
    let source = loaded(MemoryBlobStore::new());
    source.add_session(session("s1", 0), 1.0, 1.0).unwrap();
    source.add_session(session("s2", 1), 2.0, 2.0).unwrap();
    let exported = source.export_all().unwrap();

    let target = loaded(MemoryBlobStore::new());
    target.add_session(session("local", 2), 1.0, 1.0).unwrap();

    let first = target.import_merge(exported.clone(), true).unwrap();
    assert_eq!(
        first,
        ImportSummary {
            points_added: 1,
            sessions_added: 2
        }
    );
    let after_once = target.total_session_count();

    let second = target.import_merge(exported, true).unwrap();
    assert_eq!(second, ImportSummary::default());
    assert_eq!(target.total_session_count(), after_once);
    assert_eq!(
        session_ids(&target.point("1.00,1.00").unwrap()),
        vec!["local", "s1"]
    );
}

/// A foreign point whose key disagrees with its coordinates is rejected and
/// nothing is imported.
#[test]
fn mismatched_import_is_rejected() {
    let store = loaded(MemoryBlobStore::new());
    store.add_session(session("s1", 0), 1.0, 1.0).unwrap();

    let mut good = store.export_all().unwrap();
    let mut bad = good[0].clone();
    bad.coordinate_key = "7.00,7.00".into();
    bad.sessions[0].session_id = "other".into();
    good.push(bad);

    let err = store.import_merge(good, true).unwrap_err();
    assert!(matches!(err, SurveyError::CoordinateKeyMismatch { .. }));
    assert_eq!(store.total_session_count(), 1);
}

/// Export blobs are canonical JSON and import back.
#[test]
fn blob_export_import() {
    let source = loaded(MemoryBlobStore::new());
    source.add_session(session("s1", 0), 1.0, 1.0).unwrap();
    let blob = source.export_blob().unwrap();
    let text = std::str::from_utf8(&blob).unwrap();
    assert!(text.contains("\"schema\": \"beacon-survey.points.v1\""));

    let target = loaded(MemoryBlobStore::new());
    let summary = target.import_blob(&blob, true).unwrap();
    assert_eq!(summary.sessions_added, 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Mappings survive a restart on the file store.
#[test]
fn file_store_survives_restart() {
    let dir = tempdir().unwrap();
    let first = session("s1", 0);
    {
        let store = loaded(FileBlobStore::open(dir.path()).unwrap());
        store.add_session(first.clone(), 1.5, 2.5).unwrap();
        store.add_session(session("s2", 1), 1.5, 2.5).unwrap();
    }
    assert!(dir
        .path()
        .join("locations/home/survey-points.v1.json")
        .is_file());

    let store = loaded(FileBlobStore::open(dir.path()).unwrap());
    let point = store.point("1.50,2.50").unwrap();
    assert_eq!(session_ids(&point), vec!["s1", "s2"]);
    let reloaded = &point.sessions[0];
    assert_eq!(reloaded.record_id, first.record_id);
    assert_eq!(reloaded.beacons[0].stats, first.beacons[0].stats);
    assert_eq!(reloaded.beacons[0].samples, first.beacons[0].samples);
}

/// A failed write is reported as applied in memory, and memory keeps the
/// mutation.
#[test]
fn write_failure_is_distinct() {
    let store = loaded(BrokenDisk::default());
    let err = store.add_session(session("s1", 0), 1.0, 1.0).unwrap_err();
    assert!(matches!(err, SurveyError::PersistenceUnavailable { .. }));
    assert!(err.applied_in_memory());
    assert_eq!(store.total_session_count(), 1);
}

/// A NaN or infinite coordinate is refused before anything is written, so
/// the location still loads after a restart.
#[test]
fn non_finite_coordinate_keeps_location_loadable() {
    let dir = tempdir().unwrap();
    {
        let store = loaded(FileBlobStore::open(dir.path()).unwrap());
        store.add_session(session("s1", 0), 1.0, 1.0).unwrap();
        let err = store
            .add_session(session("s-nan", 1), f64::NAN, 1.0)
            .unwrap_err();
        assert!(matches!(err, SurveyError::InvalidCoordinate { .. }));
        assert!(!err.applied_in_memory());
        assert!(store
            .add_session(session("s-inf", 2), 1.0, f64::NEG_INFINITY)
            .is_err());
    }

    let store = SurveyPointStore::new(FileBlobStore::open(dir.path()).unwrap());
    assert_eq!(store.set_active_location(home()).unwrap(), 1);
    assert_eq!(store.total_session_count(), 1);
}

/// Unknown locations load as empty mappings.
#[test]
fn unknown_location_is_empty() {
    let store = SurveyPointStore::new(MemoryBlobStore::new());
    let loaded = store
        .set_active_location(LocationId::new("fresh").unwrap())
        .unwrap();
    assert_eq!(loaded, 0);
    assert_eq!(store.active_location().unwrap().as_str(), "fresh");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Sessions added from many threads are all kept, in memory and on disk.
#[test]
fn concurrent_adds_are_serialized() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 12;

    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(loaded(Arc::clone(&blobs)));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let record = session(&format!("t{t}-{i}"), i as u32);
                    // Threads share four keys so appends to one point race.
                    store
                        .add_session(record, (i % 4) as f64, 0.0)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.point_count(), 4);
    assert_eq!(store.total_session_count(), THREADS * PER_THREAD);

    let reloaded = SurveyPointStore::new(Arc::clone(&blobs));
    assert_eq!(reloaded.set_active_location(home()).unwrap(), 4);
    assert_eq!(reloaded.total_session_count(), THREADS * PER_THREAD);
    for point in reloaded.export_all().unwrap() {
        let mut ids = session_ids(&point);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), THREADS * PER_THREAD / 4);
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// The store and the archive can share one blob store.
#[test]
fn archive_and_store_share_blobs() {
    let dir = tempdir().unwrap();
    let blobs = Arc::new(FileBlobStore::open(dir.path()).unwrap());
    let store = loaded(Arc::clone(&blobs));
    let archive = ScanArchive::new(Arc::clone(&blobs));

    for (i, id) in ["s2", "s1"].into_iter().enumerate() {
        let record = session(id, 10 - i as u32);
        archive.write(&record).unwrap();
        store.add_session(record, 3.0, 4.0).unwrap();
    }

    let keys = blobs.list("locations/home/").unwrap();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().any(|k| k.ends_with("survey-points.v1.json")));

    let history = archive.history(&home(), "point-a").unwrap();
    let ids: Vec<_> = history.iter().map(|r| r.session_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
}
