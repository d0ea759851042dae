//! Value types exchanged with the sheet service.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle for a sheet.
///
/// Sheets reference each other by id only; the service owns the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(String);

impl SheetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SheetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SheetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A direct child of a sheet, as returned by child enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildEntry {
    /// Child sheet id, relative to the parent.
    pub id: String,
    pub name: String,
    /// Filter selecting the parent rows that belong to this child.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Sheet metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub record_count: i64,
    pub parent_name: Option<String>,
    pub latest_version: u64,
}
