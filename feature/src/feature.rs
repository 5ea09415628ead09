//! Feature and definition traits.
//!
//! A feature is a named capability instance owned by exactly one entity. On
//! top of the base trait it may expose optional capabilities: hiding (taken
//! out of entity equality), persistence (picked up by snapshot collaborators)
//! and one-shot initialization from the definition that fetched it.

use crate::{FeatureError, FeatureResult, HolderRef};
use std::any::{type_name, Any};
use std::rc::Rc;
use weave_core::Value;

/// Downcasting support for shared trait objects.
pub trait AsAny: Any {
    /// Convert a shared trait object into a shared `Any`.
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;

    /// Name of the concrete type, for diagnostics.
    fn any_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn any_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// A named capability attached to one entity.
pub trait Feature: AsAny {
    /// The name of the definition this feature was created from.
    fn name(&self) -> &str;

    /// The entity this feature belongs to.
    fn holder(&self) -> &HolderRef;

    /// Value compared by entity equality; stateless features return `None`.
    fn state(&self) -> Option<Value> {
        None
    }

    fn as_hideable(&self) -> Option<&dyn Hideable> {
        None
    }

    fn as_persistable(&self) -> Option<&dyn Persistable> {
        None
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        None
    }
}

/// A feature whose hidden state excludes it from entity equality.
///
/// The state is re-read on every registry access.
pub trait Hideable {
    fn is_hidden(&self) -> bool;
}

/// How a persisted value refers to other entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferenceMode {
    /// Referenced entities are stored by id and must be captured alongside.
    #[default]
    Reference,
    /// Referenced entities are embedded as copies and restored as new
    /// entities.
    Value,
}

/// A feature that snapshot collaborators may write out and read back.
pub trait Persistable {
    /// Whether collaborators must include this feature.
    fn is_persistent(&self) -> bool;

    /// How entity references in [`export`](Persistable::export) are written.
    fn reference_mode(&self) -> ReferenceMode {
        ReferenceMode::Reference
    }

    /// The value to persist.
    fn export(&self) -> Value;

    /// Restore a persisted value, bypassing any handlers.
    fn import(&self, value: Value) -> FeatureResult<()>;
}

/// A feature configured once by the definition that first fetched it.
pub trait Initializable {
    fn is_initialized(&self) -> bool;

    /// Receives the exact definition instance passed to the fetch.
    ///
    /// Implementations downcast to the definition type they expect and fail
    /// with [`FeatureError::InitializationMismatch`] on anything else.
    fn initialize(&self, definition: Rc<dyn Any>) -> FeatureResult<()>;
}

/// Immutable blueprint that names and constructs a feature.
pub trait Definition: Any {
    type Feature: Feature;

    /// Unique per entity.
    fn name(&self) -> &str;

    /// Construct an uninitialized feature for `holder`.
    fn create(&self, holder: &HolderRef) -> Self::Feature;
}

/// Downcast a stored feature to its concrete type.
pub fn downcast_feature<F: Feature>(feature: &Rc<dyn Feature>) -> Option<Rc<F>> {
    Rc::clone(feature).into_any_rc().downcast::<F>().ok()
}

/// Downcast the definition handed to [`Initializable::initialize`].
pub fn downcast_definition<D: Any>(
    feature_name: &str,
    definition: Rc<dyn Any>,
) -> FeatureResult<Rc<D>> {
    definition
        .downcast::<D>()
        .map_err(|_| FeatureError::initialization_mismatch(feature_name, type_name::<D>()))
}
