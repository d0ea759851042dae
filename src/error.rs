//! Error types for partition scanning and replication.

use thiserror::Error;

use crate::service::ServiceError;

/// Result type for partition operations.
pub type Result<T> = std::result::Result<T, GeofenceError>;

#[derive(Error, Debug)]
pub enum GeofenceError {
    /// A partition handed to the writer lacks a name or usable geometry.
    #[error("incomplete partition '{name}': {reason}")]
    IncompletePartition { name: String, reason: String },

    /// The sheet service or polygon store failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl GeofenceError {
    pub fn incomplete(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompletePartition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_incomplete_partition(&self) -> bool {
        matches!(self, Self::IncompletePartition { .. })
    }
}
