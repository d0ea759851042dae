//! Writing partitions into a target sheet.
//!
//! Partitions are identified by name alone. If the target already has a
//! child with the partition's name, that child is reused as is, whatever its
//! geometry. Otherwise a polygon is stored under the target and a child sheet
//! filtered on it is created.
//!
//! The two creations are not atomic: if child creation fails the polygon
//! stays behind, unreferenced.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{GeofenceError, Result};
use crate::filter::filter_for_polygon;
use crate::partition::{points_from_schema, GeoPoint, PartitionRecord};
use crate::scan::{PartitionScanner, SkipObserver};
use crate::service::{GeoBackend, SheetId};

/// Whether a write reused an existing child or created a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Reused,
    Created,
}

/// Result of writing one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPartition {
    /// The partition as it exists under the target.
    pub record: PartitionRecord,
    pub outcome: WriteOutcome,
}

pub struct PartitionWriter<'a, B: GeoBackend + ?Sized> {
    backend: &'a B,
    scanner: PartitionScanner<'a, B>,
}

impl<'a, B: GeoBackend + ?Sized> PartitionWriter<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            scanner: PartitionScanner::new(backend),
        }
    }

    /// Report children skipped while resolving existing partitions.
    pub fn with_observer(mut self, observer: Arc<dyn SkipObserver>) -> Self {
        self.scanner = self.scanner.with_observer(observer);
        self
    }

    /// Make sure `target` has a partition named like `source`, returning
    /// that partition.
    pub async fn ensure(&self, target: &SheetId, source: &PartitionRecord) -> Result<PartitionRecord> {
        Ok(self.write(target, source).await?.record)
    }

    /// Like [`ensure`](Self::ensure), also reporting whether the partition
    /// was created.
    pub async fn write(&self, target: &SheetId, source: &PartitionRecord) -> Result<WrittenPartition> {
        let vertices = validate(source)?;
        let name = source.name.as_str();

        // Last match wins when siblings share a name.
        let existing = self
            .backend
            .list_children(target)
            .await?
            .into_iter()
            .filter(|child| child.name == name)
            .last();

        if let Some(child) = existing {
            let child_sheet = self.backend.child_sheet(target, &child.id);
            let record = match self.scanner.resolve_one(target, child).await? {
                Some(record) => record,
                None => {
                    warn!(
                        parent = %target,
                        partition = name,
                        "reusing same-named child that is not a geofence partition"
                    );
                    source.rebind(target.clone(), child_sheet, None)
                }
            };
            debug!(parent = %target, partition = name, "partition already exists");
            return Ok(WrittenPartition {
                record,
                outcome: WriteOutcome::Reused,
            });
        }

        let polygon_id = self.backend.create_polygon(target, name, &vertices).await?;
        let filter = filter_for_polygon(&polygon_id);
        let child_sheet = self
            .backend
            .create_child_from_filter(target, name, &filter, false)
            .await?;

        info!(
            parent = %target,
            partition = name,
            sheet = %child_sheet,
            polygon = %polygon_id,
            "created partition"
        );

        Ok(WrittenPartition {
            record: source.rebind(target.clone(), child_sheet, Some(polygon_id)),
            outcome: WriteOutcome::Created,
        })
    }
}

/// Check that `source` can be written and return its vertices.
fn validate(source: &PartitionRecord) -> Result<Vec<GeoPoint>> {
    if source.name.is_empty() {
        return Err(GeofenceError::incomplete("", "missing name"));
    }
    let Some(polygon) = &source.polygon else {
        return Err(GeofenceError::incomplete(&source.name, "missing polygon geometry"));
    };
    match polygon.vertex_count() {
        None => Err(GeofenceError::incomplete(
            &source.name,
            format!(
                "{} latitudes but {} longitudes",
                polygon.lat.len(),
                polygon.long.len()
            ),
        )),
        Some(0) => Err(GeofenceError::incomplete(&source.name, "polygon has no vertices")),
        Some(_) => Ok(points_from_schema(polygon)),
    }
}
