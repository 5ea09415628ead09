//! Persistence error types.

use thiserror::Error;
use weave_dispatch::DispatchError;
use weave_feature::FeatureError;

/// Result type for snapshot operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur while writing or restoring snapshots.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown type in snapshot: {0}")]
    UnknownType(String),

    #[error("Unknown definition in snapshot: {0}")]
    UnknownDefinition(String),

    #[error("Feature '{0}' cannot be restored: not persistable")]
    NotPersistable(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
