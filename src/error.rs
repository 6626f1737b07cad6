//! Error taxonomy for the synchronization engine.
//!
//! Only `SyncError` variants surface from the top-level run call; per-object
//! failures are captured as `ExportError` and folded into the run result.

use thiserror::Error;

use crate::catalog::ObjectId;

/// Run-level errors. A thrown `SyncError` means nothing was attempted.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Required server/class metadata is missing. Fatal before any export.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested server key does not match any enabled target server.
    #[error("target server '{0}' not found among enabled servers")]
    ServerNotFound(String),

    /// No target server is enabled at all.
    #[error("no enabled target servers are configured")]
    NoEnabledServers,

    /// Underlying catalog store failure during selection.
    #[error("store error: {0}")]
    Store(anyhow::Error),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Store(err)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// One object failed to transform or write remotely.
///
/// Recovered locally by the batch runner: recorded, logged, and the run
/// continues with the next candidate. The display format matches the
/// per-object error lines in the audit log.
#[derive(Debug, Error)]
#[error("OBJECT ID {object_id}: {cause}")]
pub struct ExportError {
    pub object_id: ObjectId,
    pub cause: anyhow::Error,
}

impl ExportError {
    pub fn new(object_id: ObjectId, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            object_id,
            cause: cause.into(),
        }
    }
}
