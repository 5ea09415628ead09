//! Weave Persist
//!
//! JSON snapshots of entity features.
//!
//! Only features that report themselves persistent are captured. Entities
//! marked transient are left out, and references to them are dropped from
//! lists and nulled where they are a property's whole value.
//!
//! References are written by id unless the feature asks for
//! [`ReferenceMode::Value`](weave_feature::ReferenceMode::Value), in which
//! case the referenced entities are embedded and restored as new copies.

mod error;
mod snapshot;

pub use error::{PersistError, PersistResult};
pub use snapshot::{EntitySnapshot, RestoreStats, Snapshot};
