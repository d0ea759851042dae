//! # Geofence
//!
//! Replicates geofence partition trees between hierarchical sheets.
//!
//! A sheet can be partitioned into child sheets, each selecting the parent
//! rows that fall inside a stored polygon. Partitions can be partitioned
//! again, forming a tree. This crate discovers such a tree under one sheet
//! and reproduces it under another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  TreeReplicator (copy)                  │
//! │        depth first, one partition at a time             │
//! └─────────────────────────────────────────────────────────┘
//!              │                              │
//!              ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │ PartitionScanner (scan)  │◀──│     PartitionWriter      │
//! │ children -> records      │   │ reuse by name or create  │
//! └──────────────────────────┘   └──────────────────────────┘
//!              │      filter codec, map_sequential      │
//!              ▼                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          GeoBackend (SheetService + PolygonStore)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use geofence::service::MemoryBackend;
//!
//! let backend = MemoryBackend::load("sheets.json")?;
//! let summary = geofence::copy(&backend, Some(&source), Some(&dest)).await?;
//! println!("{} created, {} reused", summary.created, summary.reused);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod partition;
pub mod replicate;
pub mod scan;
pub mod sequential;
pub mod service;
pub mod writer;

pub use error::{GeofenceError, Result};
pub use filter::{filter_for_polygon, polygon_id_from_filter};
pub use partition::{GeoPoint, PartitionRecord, PolygonSchema, UNKNOWN_RECORD_COUNT};
pub use replicate::{CopySummary, TreeReplicator};
pub use scan::{PartitionNode, PartitionScanner, SkipObserver, SkipReason, SkippedChild};
pub use service::{GeoBackend, SheetId};
pub use writer::{PartitionWriter, WriteOutcome, WrittenPartition};

/// Partitions directly under `sheet`.
pub async fn scan<B: GeoBackend + ?Sized>(backend: &B, sheet: &SheetId) -> Result<Vec<PartitionRecord>> {
    PartitionScanner::new(backend).list_existing(sheet).await
}

/// Copy the partition tree under `source` into `dest`. A no-op when either
/// sheet is absent.
pub async fn copy<B: GeoBackend + ?Sized>(
    backend: &B,
    source: Option<&SheetId>,
    dest: Option<&SheetId>,
) -> Result<CopySummary> {
    TreeReplicator::new(backend).copy(source, dest).await
}
