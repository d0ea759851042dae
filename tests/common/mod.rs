//! Shared fixtures for integration tests.

#![allow(dead_code)]

use geofence::service::MemoryBackend;
use geofence::{GeoPoint, SheetId};

pub fn triangle() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(47.60, -122.33),
        GeoPoint::new(47.62, -122.35),
        GeoPoint::new(47.61, -122.30),
    ]
}

pub fn square(offset: f64) -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(offset, offset),
        GeoPoint::new(offset, offset + 1.0),
        GeoPoint::new(offset + 1.0, offset + 1.0),
        GeoPoint::new(offset + 1.0, offset),
    ]
}

/// Source tree used across tests:
///
/// ```text
/// Voters
///   Zone1 (triangle)
///     ZoneA
///     ZoneB
///   Zone2
/// ```
pub struct Fixture {
    pub backend: MemoryBackend,
    pub source: SheetId,
    pub dest: SheetId,
    pub zone1: SheetId,
    pub zone2: SheetId,
}

pub fn zones() -> Fixture {
    let backend = MemoryBackend::new();
    let source = backend.add_root("Voters");
    let dest = backend.add_root("Voters 2024");

    let zone1 = backend.add_partition(&source, "Zone1", &triangle(), 120).unwrap();
    backend.add_partition(&zone1, "ZoneA", &square(0.0), 70).unwrap();
    backend.add_partition(&zone1, "ZoneB", &square(5.0), 50).unwrap();
    let zone2 = backend.add_partition(&source, "Zone2", &square(10.0), 30).unwrap();

    Fixture {
        backend,
        source,
        dest,
        zone1,
        zone2,
    }
}

/// Last child of `parent` named `name`, panicking if there is none.
pub fn child(backend: &MemoryBackend, parent: &SheetId, name: &str) -> SheetId {
    backend
        .find_child(parent, name)
        .unwrap_or_else(|| panic!("no child named {} under {}", name, parent))
}
