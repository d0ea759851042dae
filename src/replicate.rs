//! Recursive copy of a partition tree from one sheet to another.
//!
//! ```text
//! copy(S, D)
//!   for each partition P of S, in order:
//!     P' = write P under D          (reuse by name, or create)
//!     copy(P.sheet, P'.sheet)       (before moving on to P's next sibling)
//! ```
//!
//! Everything runs one call at a time. Re-running a copy against a
//! destination that already has the partitions reuses them by name and
//! continues into their children, so a repeated copy acts as a sync.
//! A failed copy leaves whatever was already created in place; running it
//! again is the way to finish it.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::error::{GeofenceError, Result};
use crate::scan::{PartitionScanner, SkipObserver};
use crate::sequential::map_sequential;
use crate::service::{GeoBackend, SheetId};
use crate::writer::{PartitionWriter, WriteOutcome};

/// What a copy did to the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Partitions created in the destination.
    pub created: usize,
    /// Partitions that already existed by name and were reused.
    pub reused: usize,
    /// Deepest partition level reached, 0 when nothing was copied.
    pub depth: usize,
}

impl CopySummary {
    fn single(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Created => Self {
                created: 1,
                reused: 0,
                depth: 1,
            },
            WriteOutcome::Reused => Self {
                created: 0,
                reused: 1,
                depth: 1,
            },
        }
    }

    /// Fold in the summary of the level below this one.
    fn nest(self, below: CopySummary) -> Self {
        Self {
            created: self.created + below.created,
            reused: self.reused + below.reused,
            depth: self.depth + below.depth,
        }
    }

    /// Combine the summaries of two siblings.
    fn merge(self, other: CopySummary) -> Self {
        Self {
            created: self.created + other.created,
            reused: self.reused + other.reused,
            depth: self.depth.max(other.depth),
        }
    }

    /// Number of partitions visited.
    pub fn total(&self) -> usize {
        self.created + self.reused
    }
}

pub struct TreeReplicator<'a, B: GeoBackend + ?Sized> {
    scanner: PartitionScanner<'a, B>,
    writer: PartitionWriter<'a, B>,
}

impl<'a, B: GeoBackend + ?Sized> TreeReplicator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            scanner: PartitionScanner::new(backend),
            writer: PartitionWriter::new(backend),
        }
    }

    /// Report every child skipped on either side of the copy.
    pub fn with_observer(mut self, observer: Arc<dyn SkipObserver>) -> Self {
        self.scanner = self.scanner.with_observer(observer.clone());
        self.writer = self.writer.with_observer(observer);
        self
    }

    /// Copy the partition tree under `source` into `dest`.
    ///
    /// Does nothing when either sheet is absent.
    pub async fn copy(&self, source: Option<&SheetId>, dest: Option<&SheetId>) -> Result<CopySummary> {
        let summary = self.copy_level(source, dest).await?;
        if let (Some(source), Some(dest)) = (source, dest) {
            info!(
                source = %source,
                dest = %dest,
                created = summary.created,
                reused = summary.reused,
                depth = summary.depth,
                "geofence copy complete"
            );
        }
        Ok(summary)
    }

    fn copy_level<'s>(
        &'s self,
        source: Option<&'s SheetId>,
        dest: Option<&'s SheetId>,
    ) -> BoxFuture<'s, Result<CopySummary>> {
        async move {
            let (Some(source), Some(dest)) = (source, dest) else {
                return Ok(CopySummary::default());
            };

            let partitions = self.scanner.list_existing(source).await?;
            debug!(source = %source, dest = %dest, count = partitions.len(), "copying partitions");

            let summaries = map_sequential(partitions, |partition| async move {
                let written = self.writer.write(dest, &partition).await?;
                let below = self
                    .copy_level(partition.sheet.as_ref(), written.record.sheet.as_ref())
                    .await?;
                Ok::<_, GeofenceError>(CopySummary::single(written.outcome).nest(below))
            })
            .await?;

            Ok(summaries
                .into_iter()
                .fold(CopySummary::default(), CopySummary::merge))
        }
        .boxed()
    }
}
