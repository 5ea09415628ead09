//! Weave Feature
//!
//! The per-entity feature registry. Features are created lazily from their
//! definitions, initialized exactly once with the definition that fetched
//! them, and tracked in a visibility index that drives entity equality.

mod entity;
mod error;
mod feature;
mod registry;
mod visibility;

pub use entity::{Entity, HolderRef};
pub use error::{FeatureError, FeatureResult};
pub use feature::{
    downcast_definition, downcast_feature, AsAny, Definition, Feature, Hideable, Initializable,
    Persistable, ReferenceMode,
};
pub use registry::FeatureRegistry;
pub use visibility::VisibilityIndex;
