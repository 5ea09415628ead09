//! Weave Registry
//!
//! Type hierarchy and handler registration. The hierarchy replaces runtime
//! reflection with an explicit, precomputed ancestor relation; the executor
//! registry resolves, per concrete type, which registered handlers apply and
//! in what order they run.

mod builder;
mod executor;
mod hierarchy;
mod priority;
mod types;

pub use builder::{validate_name, HierarchyBuilder, RegistryError, RegistryResult, TypeBuilder};
pub use executor::{ExecutorRegistry, Registered, Resolution};
pub use hierarchy::TypeHierarchy;
pub use priority::{Priority, TieBreak};
pub use types::*;
