//! Sheet service error types.

use std::io;
use thiserror::Error;

use super::SheetId;

/// Result type for sheet service and polygon store operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised by the sheet service or polygon store.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The sheet id does not resolve to a sheet.
    #[error("sheet not found: {0}")]
    SheetNotFound(SheetId),

    /// The service rejected the request.
    #[error("service error: {message} (code: {code})")]
    Remote {
        /// Error code from the service.
        code: String,
        /// Error message from the service.
        message: String,
    },

    /// Failure injected by a test backend.
    #[error("injected failure: {0}")]
    Injected(String),

    /// Failed to read or write a snapshot file.
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Snapshot contents could not be encoded or decoded.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl ServiceError {
    /// Create a remote error from an error response.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }
}
