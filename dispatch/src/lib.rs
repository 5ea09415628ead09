//! Weave Dispatch
//!
//! Operations attached to entities and the prioritized interceptor chains
//! that run them.
//!
//! Responsibilities:
//! - Validate and coerce call arguments against declared parameter shapes
//! - Run resolved handlers as a chain each handler may continue or cut short
//! - Functions, properties and collection properties built on that chain
//! - The setup context that owns the type hierarchy and all definitions

mod chain;
mod collection;
mod config;
mod context;
mod error;
mod function;
mod operation;
mod property;
mod shape;
mod storage;

pub use chain::{handler, Executor, Handler, InvocationChain};
pub use collection::{CollectionBuilder, CollectionProperty, CollectionPropertyDefinition};
pub use config::WeaveConfig;
pub use context::{Context, DefinitionEntry};
pub use error::{DispatchError, DispatchResult};
pub use function::{Function, FunctionDefinition};
pub use operation::Operations;
pub use property::{Property, PropertyBuilder, PropertyDefinition};
pub use shape::ParamShape;
pub use storage::{ReferenceStorage, StandardStorage, Storage};

pub use weave_feature::ReferenceMode;
pub use weave_registry::Priority;

/// Sub-operation run by a bare function.
pub const INVOKE: &str = "invoke";
/// Property read.
pub const GETTER: &str = "getter";
/// Property write.
pub const SETTER: &str = "setter";
/// Collection insert.
pub const ADDER: &str = "adder";
/// Collection removal.
pub const REMOVER: &str = "remover";
/// Name of the built-in storage handlers.
pub const STORAGE_HANDLER: &str = "storage";
