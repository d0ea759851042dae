//! Sheet service and polygon store abstractions.
//!
//! The partition algorithms never talk to a hosted service directly. They go
//! through two narrow async traits:
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │         SheetService         │   │         PolygonStore         │
//! │  - list_children()           │   │  - get_polygon()             │
//! │  - get_info()                │   │  - create_polygon()          │
//! │  - create_child_from_filter()│   │                              │
//! │  - child_sheet()  (sync)     │   │  (scoped per owning sheet)   │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!                 \                               /
//!                  └──────── GeoBackend ─────────┘
//! ```
//!
//! [`MemoryBackend`] implements both over an in-process sheet forest.

mod error;
mod memory;
mod types;

use async_trait::async_trait;

use crate::partition::{GeoPoint, PolygonSchema};

pub use error::{ServiceError, ServiceResult};
pub use memory::{FailPoint, MemoryBackend, MemoryStats};
pub use types::{ChildEntry, SheetId, SheetInfo};

/// Hierarchical sheet operations.
#[async_trait]
pub trait SheetService: Send + Sync {
    /// Direct children of `sheet`, in the service's enumeration order.
    async fn list_children(&self, sheet: &SheetId) -> ServiceResult<Vec<ChildEntry>>;

    /// Metadata for `sheet`.
    async fn get_info(&self, sheet: &SheetId) -> ServiceResult<SheetInfo>;

    /// Create a child of `parent` whose rows are selected by `filter`.
    ///
    /// With `recursive` unset the child starts with no children of its own.
    async fn create_child_from_filter(
        &self,
        parent: &SheetId,
        name: &str,
        filter: &str,
        recursive: bool,
    ) -> ServiceResult<SheetId>;

    /// Resolve a child id returned by [`list_children`](Self::list_children)
    /// into a sheet handle. Pure reference resolution, no I/O.
    fn child_sheet(&self, parent: &SheetId, child_id: &str) -> SheetId;
}

/// Polygon geometry storage, scoped to an owning sheet.
#[async_trait]
pub trait PolygonStore: Send + Sync {
    /// Geometry for `polygon_id`, or `None` if the owner has no such polygon.
    async fn get_polygon(
        &self,
        owner: &SheetId,
        polygon_id: &str,
    ) -> ServiceResult<Option<PolygonSchema>>;

    /// Store a polygon under `owner` and return its new id.
    async fn create_polygon(
        &self,
        owner: &SheetId,
        name: &str,
        vertices: &[GeoPoint],
    ) -> ServiceResult<String>;
}

/// Everything the partition algorithms need from the outside world.
pub trait GeoBackend: SheetService + PolygonStore {}

impl<T: SheetService + PolygonStore> GeoBackend for T {}
