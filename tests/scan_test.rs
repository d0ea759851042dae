//! Integration tests for partition scanning.

mod common;

use std::sync::{Arc, Mutex};

use geofence::service::{FailPoint, MemoryBackend};
use geofence::{
    filter_for_polygon, scan, GeofenceError, PartitionScanner, PolygonSchema, SkipReason,
    SkippedChild,
};

use common::{square, triangle, zones};

#[tokio::test]
async fn test_scan_skips_non_partitions() {
    let backend = MemoryBackend::new();
    let root = backend.add_root("Voters");
    backend.add_child(&root, "A", None).unwrap();
    backend
        .add_child(&root, "B", Some(filter_for_polygon("x").as_str()))
        .unwrap();
    let c = backend
        .add_child(&root, "C", Some(filter_for_polygon("y").as_str()))
        .unwrap();
    backend
        .insert_polygon(&root, "y", PolygonSchema::from_points(&triangle()))
        .unwrap();

    let records = scan(&backend, &root).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "C");
    assert_eq!(records[0].sheet, Some(c));
    assert_eq!(records[0].polygon_id.as_deref(), Some("y"));
    assert_eq!(
        records[0].polygon,
        Some(PolygonSchema::from_points(&triangle()))
    );
}

#[tokio::test]
async fn test_observer_sees_each_skip() {
    let backend = MemoryBackend::new();
    let root = backend.add_root("Voters");
    backend.add_child(&root, "A", None).unwrap();
    backend.add_child(&root, "Dems", Some("Party == 'D'")).unwrap();
    backend
        .add_child(&root, "B", Some(filter_for_polygon("x").as_str()))
        .unwrap();
    backend.add_partition(&root, "C", &square(0.0), 4).unwrap();

    let seen: Arc<Mutex<Vec<SkippedChild>>> = Arc::default();
    let sink = seen.clone();
    let scanner = PartitionScanner::new(&backend)
        .with_observer(Arc::new(move |s: &SkippedChild| sink.lock().unwrap().push(s.clone())));

    let records = scanner.list_existing(&root).await.unwrap();
    assert_eq!(records.len(), 1);

    let seen = seen.lock().unwrap();
    let reasons: Vec<_> = seen
        .iter()
        .map(|s| (s.child_name.as_str(), s.reason.clone()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("A", SkipReason::NoFilter),
            ("Dems", SkipReason::NotGeofence),
            (
                "B",
                SkipReason::MissingPolygon {
                    polygon_id: "x".to_string()
                }
            ),
        ]
    );
    assert!(seen.iter().all(|s| s.owner == root));
}

#[tokio::test]
async fn test_scan_preserves_child_order() {
    let backend = MemoryBackend::new();
    let root = backend.add_root("Voters");
    for (i, name) in ["West", "East", "North", "South"].iter().enumerate() {
        backend
            .add_partition(&root, name, &square(i as f64), i as i64)
            .unwrap();
    }
    backend.add_child(&root, "Unfiltered", None).unwrap();

    let names: Vec<_> = scan(&backend, &root)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["West", "East", "North", "South"]);
}

#[tokio::test]
async fn test_scan_reads_record_counts() {
    let f = zones();
    let records = scan(&f.backend, &f.source).await.unwrap();

    let counts: Vec<_> = records.iter().map(|r| (r.name.as_str(), r.record_count)).collect();
    assert_eq!(counts, vec![("Zone1", 120), ("Zone2", 30)]);
    assert!(records.iter().all(|r| r.owner == f.source));
    assert_eq!(records[0].sheet.as_ref(), Some(&f.zone1));
    assert_eq!(records[1].sheet.as_ref(), Some(&f.zone2));
}

#[tokio::test]
async fn test_scan_tree_outline() {
    let f = zones();
    let tree = PartitionScanner::new(&f.backend)
        .scan_tree(&f.source)
        .await
        .unwrap();

    insta::assert_snapshot!(geofence::scan::render_outline(&tree), @r"
    Zone1
      ZoneA
      ZoneB
    Zone2
    ");
}

#[tokio::test]
async fn test_scan_of_leaf_is_empty() {
    let f = zones();
    assert!(scan(&f.backend, &f.zone2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_service_failure_propagates() {
    let f = zones();
    f.backend.fail_next(FailPoint::GetPolygon);

    let err = scan(&f.backend, &f.source).await.unwrap_err();
    assert!(matches!(err, GeofenceError::Service(_)));

    // The injected failure is consumed; a retry succeeds.
    assert_eq!(scan(&f.backend, &f.source).await.unwrap().len(), 2);
}
