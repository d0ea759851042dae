//! In-process sheet service and polygon store.
//!
//! Holds a forest of sheets plus per-sheet polygon tables behind a mutex.
//! Used by the CLI (backed by a JSON snapshot file) and by tests, which also
//! use its builder helpers and fault injection.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{ChildEntry, PolygonStore, ServiceError, ServiceResult, SheetId, SheetInfo, SheetService};
use crate::filter::{filter_for_polygon, polygon_id_from_filter};
use crate::partition::{GeoPoint, PolygonSchema};

/// Backend operation that can be made to fail with [`MemoryBackend::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    ListChildren,
    GetInfo,
    GetPolygon,
    CreatePolygon,
    CreateChild,
}

/// Mutations performed through the service traits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub polygons_created: usize,
    pub sheets_created: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SheetNode {
    name: String,
    #[serde(default)]
    parent: Option<SheetId>,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    children: Vec<SheetId>,
    #[serde(default)]
    record_count: i64,
    #[serde(default = "initial_version")]
    version: u64,
}

fn initial_version() -> u64 {
    1
}

/// Serialized form of the whole backend.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Forest {
    #[serde(default)]
    sheets: BTreeMap<SheetId, SheetNode>,
    /// Owning sheet -> polygon id -> geometry.
    #[serde(default)]
    polygons: BTreeMap<SheetId, BTreeMap<String, PolygonSchema>>,
}

impl Forest {
    fn sheet(&self, id: &SheetId) -> ServiceResult<&SheetNode> {
        self.sheets
            .get(id)
            .ok_or_else(|| ServiceError::SheetNotFound(id.clone()))
    }

    fn sheet_mut(&mut self, id: &SheetId) -> ServiceResult<&mut SheetNode> {
        self.sheets
            .get_mut(id)
            .ok_or_else(|| ServiceError::SheetNotFound(id.clone()))
    }

    fn insert_child(
        &mut self,
        parent: &SheetId,
        name: &str,
        filter: Option<String>,
    ) -> ServiceResult<SheetId> {
        let id = SheetId::new(Uuid::new_v4().to_string());
        let parent_node = self.sheet_mut(parent)?;
        parent_node.children.push(id.clone());
        parent_node.version += 1;

        self.sheets.insert(
            id.clone(),
            SheetNode {
                name: name.to_string(),
                parent: Some(parent.clone()),
                filter,
                children: Vec::new(),
                record_count: 0,
                version: initial_version(),
            },
        );
        Ok(id)
    }

    fn insert_polygon(&mut self, owner: &SheetId, id: String, polygon: PolygonSchema) -> ServiceResult<()> {
        self.sheet(owner)?;
        self.polygons.entry(owner.clone()).or_default().insert(id, polygon);
        Ok(())
    }
}

#[derive(Default)]
struct State {
    forest: Forest,
    /// Armed failures: operation and number of calls to let through first.
    pending_failures: Vec<(FailPoint, usize)>,
    stats: MemoryStats,
}

impl State {
    fn check(&mut self, point: FailPoint) -> ServiceResult<()> {
        let Some(idx) = self.pending_failures.iter().position(|(p, _)| *p == point) else {
            return Ok(());
        };
        let remaining = &mut self.pending_failures[idx].1;
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(());
        }
        self.pending_failures.remove(idx);
        Err(ServiceError::Injected(format!("{:?}", point)))
    }
}

/// Sheet service and polygon store over an in-memory sheet forest.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a backend from a JSON snapshot written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let content = fs::read_to_string(path)?;
        let forest: Forest = serde_json::from_str(&content)?;
        Ok(Self {
            state: Mutex::new(State {
                forest,
                ..State::default()
            }),
        })
    }

    /// Write the current forest to a JSON snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> ServiceResult<()> {
        let json = serde_json::to_string_pretty(&self.state().forest)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Add a top-level sheet.
    pub fn add_root(&self, name: &str) -> SheetId {
        let id = SheetId::new(Uuid::new_v4().to_string());
        self.state().forest.sheets.insert(
            id.clone(),
            SheetNode {
                name: name.to_string(),
                parent: None,
                filter: None,
                children: Vec::new(),
                record_count: 0,
                version: initial_version(),
            },
        );
        id
    }

    /// Add a child sheet with an arbitrary (or no) filter.
    pub fn add_child(&self, parent: &SheetId, name: &str, filter: Option<&str>) -> ServiceResult<SheetId> {
        self.state()
            .forest
            .insert_child(parent, name, filter.map(str::to_string))
    }

    /// Store a polygon under `owner` with a caller-chosen id.
    pub fn insert_polygon(&self, owner: &SheetId, id: &str, polygon: PolygonSchema) -> ServiceResult<()> {
        self.state().forest.insert_polygon(owner, id.to_string(), polygon)
    }

    /// Add a geofence partition: stores the polygon and creates a child
    /// selecting it. Not counted in [`stats`](Self::stats).
    pub fn add_partition(
        &self,
        parent: &SheetId,
        name: &str,
        vertices: &[GeoPoint],
        record_count: i64,
    ) -> ServiceResult<SheetId> {
        let polygon_id = Uuid::new_v4().to_string();
        let mut state = self.state();
        state
            .forest
            .insert_polygon(parent, polygon_id.clone(), PolygonSchema::from_points(vertices))?;
        let child = state
            .forest
            .insert_child(parent, name, Some(filter_for_polygon(&polygon_id)))?;
        state.forest.sheet_mut(&child)?.record_count = record_count;
        Ok(child)
    }

    /// Make the next call of `point` fail with [`ServiceError::Injected`].
    pub fn fail_next(&self, point: FailPoint) {
        self.fail_after(point, 0);
    }

    /// Let `skip` calls of `point` succeed, then fail the one after.
    pub fn fail_after(&self, point: FailPoint, skip: usize) {
        self.state().pending_failures.push((point, skip));
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Names of the direct children of `sheet`, in order.
    pub fn child_names(&self, sheet: &SheetId) -> ServiceResult<Vec<String>> {
        let state = self.state();
        let node = state.forest.sheet(sheet)?;
        node.children
            .iter()
            .map(|id| state.forest.sheet(id).map(|child| child.name.clone()))
            .collect()
    }

    /// Id of the last child of `parent` named `name`.
    pub fn find_child(&self, parent: &SheetId, name: &str) -> Option<SheetId> {
        let state = self.state();
        let node = state.forest.sheets.get(parent)?;
        node.children
            .iter()
            .filter(|id| state.forest.sheets.get(*id).is_some_and(|c| c.name == name))
            .last()
            .cloned()
    }

    /// Geometry behind a child sheet's geofence filter, if any.
    pub fn polygon_of(&self, sheet: &SheetId) -> Option<PolygonSchema> {
        let state = self.state();
        let node = state.forest.sheets.get(sheet)?;
        let owner = node.parent.as_ref()?;
        let polygon_id = polygon_id_from_filter(node.filter.as_deref())?;
        state.forest.polygons.get(owner)?.get(&polygon_id).cloned()
    }

    /// Number of polygons stored under `owner`.
    pub fn polygon_count(&self, owner: &SheetId) -> usize {
        self.state().forest.polygons.get(owner).map_or(0, BTreeMap::len)
    }

    /// Top-level sheets as `(id, name)` pairs.
    pub fn roots(&self) -> Vec<(SheetId, String)> {
        self.state()
            .forest
            .sheets
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, node)| (id.clone(), node.name.clone()))
            .collect()
    }

    pub fn stats(&self) -> MemoryStats {
        self.state().stats
    }
}

#[async_trait]
impl SheetService for MemoryBackend {
    async fn list_children(&self, sheet: &SheetId) -> ServiceResult<Vec<ChildEntry>> {
        let mut state = self.state();
        state.check(FailPoint::ListChildren)?;
        let node = state.forest.sheet(sheet)?;
        node.children
            .iter()
            .map(|id| {
                state.forest.sheet(id).map(|child| ChildEntry {
                    id: id.to_string(),
                    name: child.name.clone(),
                    filter: child.filter.clone(),
                })
            })
            .collect()
    }

    async fn get_info(&self, sheet: &SheetId) -> ServiceResult<SheetInfo> {
        let mut state = self.state();
        state.check(FailPoint::GetInfo)?;
        let node = state.forest.sheet(sheet)?;
        let parent_name = match &node.parent {
            Some(parent) => Some(state.forest.sheet(parent)?.name.clone()),
            None => None,
        };
        Ok(SheetInfo {
            name: node.name.clone(),
            record_count: node.record_count,
            parent_name,
            latest_version: node.version,
        })
    }

    async fn create_child_from_filter(
        &self,
        parent: &SheetId,
        name: &str,
        filter: &str,
        recursive: bool,
    ) -> ServiceResult<SheetId> {
        let mut state = self.state();
        state.check(FailPoint::CreateChild)?;
        if recursive {
            return Err(ServiceError::remote(
                "INVALID_REQUEST",
                "recursive child creation is not supported",
            ));
        }
        let id = state.forest.insert_child(parent, name, Some(filter.to_string()))?;
        state.stats.sheets_created += 1;
        debug!(parent = %parent, child = %id, name, "created child sheet");
        Ok(id)
    }

    fn child_sheet(&self, _parent: &SheetId, child_id: &str) -> SheetId {
        SheetId::new(child_id)
    }
}

#[async_trait]
impl PolygonStore for MemoryBackend {
    async fn get_polygon(&self, owner: &SheetId, polygon_id: &str) -> ServiceResult<Option<PolygonSchema>> {
        let mut state = self.state();
        state.check(FailPoint::GetPolygon)?;
        state.forest.sheet(owner)?;
        Ok(state
            .forest
            .polygons
            .get(owner)
            .and_then(|polygons| polygons.get(polygon_id))
            .cloned())
    }

    async fn create_polygon(&self, owner: &SheetId, name: &str, vertices: &[GeoPoint]) -> ServiceResult<String> {
        let mut state = self.state();
        state.check(FailPoint::CreatePolygon)?;
        let id = Uuid::new_v4().to_string();
        state
            .forest
            .insert_polygon(owner, id.clone(), PolygonSchema::from_points(vertices))?;
        state.stats.polygons_created += 1;
        debug!(owner = %owner, polygon = %id, name, "created polygon");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(1.0, 0.0),
        ]
    }

    #[tokio::test]
    async fn test_children_keep_creation_order() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        backend.add_child(&root, "B", None).unwrap();
        backend.add_child(&root, "A", Some("Party == 'D'")).unwrap();

        let children = backend.list_children(&root).await.unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(children[1].filter.as_deref(), Some("Party == 'D'"));
    }

    #[tokio::test]
    async fn test_info_reports_parent_and_version() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        let child = backend.add_partition(&root, "North", &square(), 12).unwrap();

        let info = backend.get_info(&child).await.unwrap();
        assert_eq!(info.name, "North");
        assert_eq!(info.record_count, 12);
        assert_eq!(info.parent_name.as_deref(), Some("Voters"));

        let root_info = backend.get_info(&root).await.unwrap();
        assert_eq!(root_info.parent_name, None);
        assert_eq!(root_info.latest_version, 2);
    }

    #[tokio::test]
    async fn test_polygons_are_scoped_to_owner() {
        let backend = MemoryBackend::new();
        let a = backend.add_root("A");
        let b = backend.add_root("B");
        let id = backend.create_polygon(&a, "zone", &square()).await.unwrap();

        assert!(backend.get_polygon(&a, &id).await.unwrap().is_some());
        assert!(backend.get_polygon(&b, &id).await.unwrap().is_none());
        assert_eq!(backend.stats().polygons_created, 1);
    }

    #[tokio::test]
    async fn test_unknown_sheet() {
        let backend = MemoryBackend::new();
        let err = backend.list_children(&SheetId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::SheetNotFound(_)));
    }

    #[tokio::test]
    async fn test_fail_next_fires_once() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        backend.fail_next(FailPoint::CreateChild);

        let first = backend
            .create_child_from_filter(&root, "X", "IsInPolygon('p',Lat,Long)", false)
            .await;
        assert!(matches!(first, Err(ServiceError::Injected(_))));

        let second = backend
            .create_child_from_filter(&root, "X", "IsInPolygon('p',Lat,Long)", false)
            .await;
        assert!(second.is_ok());
        assert_eq!(backend.stats().sheets_created, 1);
    }

    #[tokio::test]
    async fn test_fail_after_skips_calls() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        backend.fail_after(FailPoint::GetInfo, 2);

        assert!(backend.get_info(&root).await.is_ok());
        assert!(backend.get_info(&root).await.is_ok());
        assert!(backend.get_info(&root).await.is_err());
        assert!(backend.get_info(&root).await.is_ok());
    }

    #[tokio::test]
    async fn test_recursive_creation_rejected() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        let result = backend
            .create_child_from_filter(&root, "X", "IsInPolygon('p',Lat,Long)", true)
            .await;
        assert!(matches!(result, Err(ServiceError::Remote { .. })));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let backend = MemoryBackend::new();
        let root = backend.add_root("Voters");
        let child = backend.add_partition(&root, "North", &square(), 5).unwrap();

        let path = std::env::temp_dir().join(format!("geofence-{}.json", Uuid::new_v4()));
        backend.save(&path).unwrap();
        let loaded = MemoryBackend::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.child_names(&root).unwrap(), vec!["North"]);
        assert_eq!(loaded.polygon_of(&child), backend.polygon_of(&child));
        assert_eq!(loaded.stats(), MemoryStats::default());
    }
}
