//! The handler table shared by every operation definition.

use crate::{
    DispatchError, DispatchResult, Handler, InvocationChain, ParamShape, Priority, Storage,
    WeaveConfig, STORAGE_HANDLER,
};
use std::cell::RefCell;
use std::rc::Rc;
use weave_core::{TypeId, Value};
use weave_feature::HolderRef;
use weave_registry::{validate_name, ExecutorRegistry, Resolution, TypeHierarchy};

/// Named operation with its variant-aware handler table.
///
/// Sub-operations (`invoke`, `getter`, `setter`, `adder`, `remover`) share
/// one registry and are resolved independently.
pub struct Operations {
    name: String,
    executors: ExecutorRegistry<Handler>,
    config: WeaveConfig,
}

impl Operations {
    pub fn new(
        name: impl Into<String>,
        hierarchy: Rc<TypeHierarchy>,
        config: WeaveConfig,
    ) -> DispatchResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            executors: ExecutorRegistry::new(hierarchy, config.tie_break),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    pub fn hierarchy(&self) -> &Rc<TypeHierarchy> {
        self.executors.hierarchy()
    }

    /// The underlying registry, for introspection.
    pub fn executors(&self) -> &ExecutorRegistry<Handler> {
        &self.executors
    }

    /// Register a user handler. [`Priority::STORAGE`] is reserved for the
    /// built-in storage handlers that end every chain.
    pub fn add_handler(
        &self,
        operation: &str,
        name: &str,
        variant: TypeId,
        handler: Handler,
        priority: Priority,
    ) -> DispatchResult<()> {
        if priority == Priority::STORAGE {
            return Err(DispatchError::ReservedPriority(priority));
        }
        self.executors
            .add_handler(operation, name, variant, handler, priority)?;
        Ok(())
    }

    pub fn remove_handler(&self, operation: &str, name: &str, variant: TypeId) -> bool {
        self.executors.remove_handler(operation, name, variant)
    }

    pub fn resolve_for(&self, concrete: TypeId) -> Rc<Resolution<Handler>> {
        self.executors.resolve_for(concrete)
    }

    /// Register a terminal storage handler against every root type, so it
    /// applies to entities of any type.
    pub(crate) fn install_storage(&self, operation: &str, handler: Handler) -> DispatchResult<()> {
        let roots: Vec<TypeId> = self
            .hierarchy()
            .all_types()
            .filter(|def| def.is_root())
            .map(|def| def.id)
            .collect();

        for root in roots {
            self.executors.add_handler(
                operation,
                STORAGE_HANDLER,
                root,
                Rc::clone(&handler),
                Priority::STORAGE,
            )?;
        }
        Ok(())
    }

    /// Build a fresh chain for `operation` on `holder` and run it.
    pub(crate) fn dispatch(
        &self,
        operation: &str,
        shape: &ParamShape,
        holder: &HolderRef,
        storage: Option<&RefCell<Box<dyn Storage>>>,
        args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let resolution = self.resolve_for(holder.type_id());
        let mut chain = InvocationChain::new(
            &self.name,
            operation,
            resolution.chain(operation),
            shape,
            holder,
            storage,
            self.config.trace_dispatch,
        );
        chain.invoke(args)
    }
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("name", &self.name)
            .field("executors", &self.executors)
            .finish()
    }
}
