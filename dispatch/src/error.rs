//! Dispatch error types.

use thiserror::Error;
use weave_core::{EntityId, ValueType};
use weave_feature::FeatureError;
use weave_registry::{Priority, RegistryError};

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur while setting up or running operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Expected {expected} argument(s), got {actual}")]
    ArgumentCount { expected: String, actual: usize },

    #[error("Argument {index} has type {actual}, expected {expected}")]
    ArgumentType {
        index: usize,
        expected: ValueType,
        actual: &'static str,
    },

    #[error("Feature '{feature}' has no storage for handler '{handler}'")]
    MissingStorage { feature: String, handler: String },

    #[error("Storage rejected value of type {actual}: {message}")]
    StorageRejected {
        actual: &'static str,
        message: String,
    },

    #[error("Feature '{0}' was used before initialization")]
    Uninitialized(String),

    #[error("Holder of feature '{0}' no longer exists")]
    HolderDropped(String),

    #[error("Duplicate definition name: {0}")]
    DuplicateDefinition(String),

    #[error("Entity id {0} is already in use")]
    DuplicateEntity(EntityId),

    #[error("Entity ids exhausted after {0}")]
    EntityIdsExhausted(EntityId),

    #[error("Priority {0} is reserved for storage handlers")]
    ReservedPriority(Priority),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl DispatchError {
    pub fn argument_count(expected: impl Into<String>, actual: usize) -> Self {
        Self::ArgumentCount {
            expected: expected.into(),
            actual,
        }
    }

    pub fn argument_type(index: usize, expected: ValueType, actual: &'static str) -> Self {
        Self::ArgumentType {
            index,
            expected,
            actual,
        }
    }

    pub fn missing_storage(feature: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::MissingStorage {
            feature: feature.into(),
            handler: handler.into(),
        }
    }

    pub fn storage_rejected(actual: &'static str, message: impl Into<String>) -> Self {
        Self::StorageRejected {
            actual,
            message: message.into(),
        }
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Returns true for argument-shape errors.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::ArgumentCount { .. } | Self::ArgumentType { .. })
    }
}
