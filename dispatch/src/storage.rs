//! Storage collaborators behind the built-in property handlers.

use crate::{DispatchError, DispatchResult};
use std::fmt;
use weave_core::Value;

/// Holds the value of one property feature.
pub trait Storage: fmt::Debug {
    fn get(&self) -> Value;

    fn set(&mut self, value: Value) -> DispatchResult<()>;

    /// An empty storage of the same kind, sharing no state with this one.
    fn reproduce(&self) -> Box<dyn Storage>;
}

/// Stores any value as-is.
#[derive(Debug, Clone, Default)]
pub struct StandardStorage {
    value: Value,
}

impl StandardStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for StandardStorage {
    fn get(&self) -> Value {
        self.value.clone()
    }

    fn set(&mut self, value: Value) -> DispatchResult<()> {
        self.value = value;
        Ok(())
    }

    fn reproduce(&self) -> Box<dyn Storage> {
        Box::new(StandardStorage::new())
    }
}

/// Stores entity references only (single references or lists of them).
///
/// Entities are kept by id, so the referenced entity is aliased rather than
/// copied.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStorage {
    value: Value,
}

impl ReferenceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_reference(value: &Value) -> bool {
        matches!(value, Value::Null | Value::EntityRef(_))
    }
}

impl Storage for ReferenceStorage {
    fn get(&self) -> Value {
        self.value.clone()
    }

    fn set(&mut self, value: Value) -> DispatchResult<()> {
        let accepted = match &value {
            Value::List(items) => items.iter().all(Self::is_reference),
            other => Self::is_reference(other),
        };
        if !accepted {
            return Err(DispatchError::storage_rejected(
                value.type_name(),
                "reference storage only holds entity references",
            ));
        }
        self.value = value;
        Ok(())
    }

    fn reproduce(&self) -> Box<dyn Storage> {
        Box::new(ReferenceStorage::new())
    }
}
