//! Discovering the geofence partitions of a sheet.
//!
//! A child sheet counts as a partition when its filter decodes to a polygon
//! id and the owner's polygon store holds that polygon. Every other child is
//! skipped. Skips are logged and reported to an optional [`SkipObserver`];
//! they never abort a scan.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::error::{GeofenceError, Result};
use crate::filter::polygon_id_from_filter;
use crate::partition::PartitionRecord;
use crate::sequential::map_sequential;
use crate::service::{ChildEntry, GeoBackend, SheetId};

/// Why a child sheet was not treated as a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The child has no filter.
    NoFilter,
    /// The filter is not a polygon membership test.
    NotGeofence,
    /// The filter names a polygon the owner's store does not have.
    MissingPolygon { polygon_id: String },
}

/// A child sheet passed over during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChild {
    pub owner: SheetId,
    pub child_id: String,
    pub child_name: String,
    pub reason: SkipReason,
}

/// Receives children skipped during a scan.
pub trait SkipObserver: Send + Sync {
    fn on_skip(&self, skipped: &SkippedChild);
}

impl<F> SkipObserver for F
where
    F: Fn(&SkippedChild) + Send + Sync,
{
    fn on_skip(&self, skipped: &SkippedChild) {
        self(skipped)
    }
}

/// A partition together with the partitions nested under it.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionNode {
    pub record: PartitionRecord,
    pub children: Vec<PartitionNode>,
}

impl PartitionNode {
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.record.name, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PartitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Render a forest of partitions as an indented outline, one name per line.
pub fn render_outline(nodes: &[PartitionNode]) -> String {
    nodes.iter().map(ToString::to_string).collect()
}

/// Reconstructs partition records from a sheet's children.
pub struct PartitionScanner<'a, B: GeoBackend + ?Sized> {
    backend: &'a B,
    observer: Option<Arc<dyn SkipObserver>>,
}

impl<'a, B: GeoBackend + ?Sized> PartitionScanner<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            observer: None,
        }
    }

    /// Report skipped children to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn SkipObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// All partitions directly under `sheet`, in child enumeration order.
    ///
    /// Children are resolved one at a time.
    pub async fn list_existing(&self, sheet: &SheetId) -> Result<Vec<PartitionRecord>> {
        let children = self.backend.list_children(sheet).await?;
        let resolved = map_sequential(children, |child| self.resolve_one(sheet, child)).await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Build the partition record for one child of `sheet`.
    ///
    /// Returns `Ok(None)` when the child is not a partition. Service
    /// failures are returned as errors.
    pub async fn resolve_one(
        &self,
        sheet: &SheetId,
        child: ChildEntry,
    ) -> Result<Option<PartitionRecord>> {
        let child_sheet = self.backend.child_sheet(sheet, &child.id);
        let info = self.backend.get_info(&child_sheet).await?;

        let Some(polygon_id) = polygon_id_from_filter(child.filter.as_deref()) else {
            let reason = if child.filter.is_none() {
                SkipReason::NoFilter
            } else {
                SkipReason::NotGeofence
            };
            self.skip(sheet, &child, reason);
            return Ok(None);
        };

        let Some(polygon) = self.backend.get_polygon(sheet, &polygon_id).await? else {
            self.skip(sheet, &child, SkipReason::MissingPolygon { polygon_id });
            return Ok(None);
        };

        Ok(Some(PartitionRecord::new(
            sheet.clone(),
            child_sheet,
            child.name,
            info.record_count,
            polygon_id,
            polygon,
        )))
    }

    /// Scan `sheet` and, depth first, every partition below it.
    pub fn scan_tree<'s>(&'s self, sheet: &'s SheetId) -> BoxFuture<'s, Result<Vec<PartitionNode>>> {
        async move {
            let partitions = self.list_existing(sheet).await?;
            map_sequential(partitions, |record| async move {
                let children = match &record.sheet {
                    Some(child) => self.scan_tree(child).await?,
                    None => Vec::new(),
                };
                Ok::<_, GeofenceError>(PartitionNode { record, children })
            })
            .await
        }
        .boxed()
    }

    fn skip(&self, owner: &SheetId, child: &ChildEntry, reason: SkipReason) {
        match &reason {
            SkipReason::MissingPolygon { polygon_id } => warn!(
                owner = %owner,
                child = %child.name,
                polygon = %polygon_id,
                "geofence filter refers to a missing polygon, skipping child"
            ),
            _ => debug!(owner = %owner, child = %child.name, ?reason, "child is not a partition"),
        }

        if let Some(observer) = &self.observer {
            observer.on_skip(&SkippedChild {
                owner: owner.clone(),
                child_id: child.id.clone(),
                child_name: child.name.clone(),
                reason,
            });
        }
    }
}
