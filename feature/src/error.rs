//! Feature error types.

use thiserror::Error;

/// Result type for feature operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Errors that can occur while fetching or initializing features.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature '{name}' is stored as {stored}, but the definition expects {expected}")]
    IdentityMismatch {
        name: String,
        expected: &'static str,
        stored: &'static str,
    },

    #[error("Feature '{name}' got an incompatible definition: expected {expected}")]
    InitializationMismatch { name: String, expected: &'static str },

    #[error("Feature '{name}' failed to initialize: {message}")]
    Initialization { name: String, message: String },

    #[error("Cannot import value into feature '{name}': {message}")]
    Import { name: String, message: String },
}

impl FeatureError {
    pub fn identity_mismatch(
        name: impl Into<String>,
        expected: &'static str,
        stored: &'static str,
    ) -> Self {
        Self::IdentityMismatch {
            name: name.into(),
            expected,
            stored,
        }
    }

    pub fn initialization_mismatch(name: impl Into<String>, expected: &'static str) -> Self {
        Self::InitializationMismatch {
            name: name.into(),
            expected,
        }
    }

    pub fn initialization(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Initialization {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn import(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Import {
            name: name.into(),
            message: message.into(),
        }
    }
}
