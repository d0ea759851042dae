//! Partition records and polygon geometry.

use serde::{Deserialize, Serialize};

use crate::service::SheetId;

/// Record count of a partition that has not been counted yet.
pub const UNKNOWN_RECORD_COUNT: i64 = -1;

/// A single polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub long: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }
}

/// Polygon geometry as stored by the polygon store: parallel latitude and
/// longitude sequences, one entry per vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonSchema {
    pub lat: Vec<f64>,
    pub long: Vec<f64>,
}

impl PolygonSchema {
    /// Build a schema from an ordered vertex list.
    pub fn from_points(points: &[GeoPoint]) -> Self {
        Self {
            lat: points.iter().map(|p| p.lat).collect(),
            long: points.iter().map(|p| p.long).collect(),
        }
    }

    /// Number of vertices, or `None` when the sequences disagree in length.
    pub fn vertex_count(&self) -> Option<usize> {
        (self.lat.len() == self.long.len()).then_some(self.lat.len())
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() && self.long.is_empty()
    }
}

/// Vertex list for a schema. Inverse of [`PolygonSchema::from_points`].
///
/// Trailing entries of the longer sequence are dropped if the lengths differ.
pub fn points_from_schema(poly: &PolygonSchema) -> Vec<GeoPoint> {
    poly.lat
        .iter()
        .zip(&poly.long)
        .map(|(&lat, &long)| GeoPoint { lat, long })
        .collect()
}

/// One geofence partition: a child sheet of `owner` whose filter selects the
/// rows inside polygon `polygon_id`.
///
/// Records are never changed in place. Rebinding a record to another sheet
/// goes through [`PartitionRecord::rebind`], which yields a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    /// Sheet this partition is a child of.
    pub owner: SheetId,
    /// The partition's own sheet. `None` only while a record is being built.
    pub sheet: Option<SheetId>,
    /// Display name, unique among the owner's children.
    pub name: String,
    /// Polygon id in the owner's polygon store.
    pub polygon_id: Option<String>,
    pub polygon: Option<PolygonSchema>,
    /// Rows matched at scan time, or [`UNKNOWN_RECORD_COUNT`].
    pub record_count: i64,
}

impl PartitionRecord {
    /// Record for a partition discovered by scanning `owner`.
    pub fn new(
        owner: SheetId,
        sheet: SheetId,
        name: impl Into<String>,
        record_count: i64,
        polygon_id: impl Into<String>,
        polygon: PolygonSchema,
    ) -> Self {
        Self {
            owner,
            sheet: Some(sheet),
            name: name.into(),
            polygon_id: Some(polygon_id.into()),
            polygon: Some(polygon),
            record_count,
        }
    }

    /// Copy of this record bound to a different owner, sheet and polygon.
    ///
    /// Name and geometry carry over; the record count becomes unknown.
    pub fn rebind(&self, owner: SheetId, sheet: SheetId, polygon_id: Option<String>) -> Self {
        Self {
            owner,
            sheet: Some(sheet),
            name: self.name.clone(),
            polygon_id,
            polygon: self.polygon.clone(),
            record_count: UNKNOWN_RECORD_COUNT,
        }
    }

    pub fn has_known_count(&self) -> bool {
        self.record_count != UNKNOWN_RECORD_COUNT
    }
}
