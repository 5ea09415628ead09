//! Bare functions: one `invoke` sub-operation with a declared shape.

use crate::{DispatchError, DispatchResult, Handler, Operations, ParamShape, Priority, INVOKE};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use weave_core::{TypeId, Value};
use weave_feature::{
    downcast_definition, Definition, Feature, FeatureResult, Hideable, HolderRef, Initializable,
};

/// Definition of a function feature.
#[derive(Debug)]
pub struct FunctionDefinition {
    operations: Operations,
    shape: ParamShape,
}

impl FunctionDefinition {
    pub fn new(operations: Operations, shape: ParamShape) -> Self {
        Self { operations, shape }
    }

    pub fn shape(&self) -> &ParamShape {
        &self.shape
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    pub fn add_handler(
        &self,
        name: &str,
        variant: TypeId,
        handler: Handler,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.operations
            .add_handler(INVOKE, name, variant, handler, priority.into())
    }

    /// Register at the configured default priority.
    pub fn add_default_handler(
        &self,
        name: &str,
        variant: TypeId,
        handler: Handler,
    ) -> DispatchResult<()> {
        let priority = self.operations.config().default_priority;
        self.add_handler(name, variant, handler, priority)
    }

    pub fn remove_handler(&self, name: &str, variant: TypeId) -> bool {
        self.operations.remove_handler(INVOKE, name, variant)
    }
}

impl PartialEq for FunctionDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.operations.name() == other.operations.name() && self.shape == other.shape
    }
}

impl Definition for FunctionDefinition {
    type Feature = Function;

    fn name(&self) -> &str {
        self.operations.name()
    }

    fn create(&self, holder: &HolderRef) -> Function {
        Function {
            name: self.name().to_string(),
            holder: holder.clone(),
            definition: RefCell::new(None),
        }
    }
}

/// A function attached to one entity.
///
/// Functions carry no state and are always hidden, so they never affect
/// entity equality.
pub struct Function {
    name: String,
    holder: HolderRef,
    definition: RefCell<Option<Rc<FunctionDefinition>>>,
}

impl Function {
    /// Run the `invoke` chain resolved for the holder's concrete type.
    ///
    /// With no applicable handler the result is `Null`.
    pub fn invoke(&self, args: Vec<Value>) -> DispatchResult<Value> {
        let definition = self.definition()?;
        definition
            .operations
            .dispatch(INVOKE, &definition.shape, &self.holder, None, args)
    }

    pub fn definition(&self) -> DispatchResult<Rc<FunctionDefinition>> {
        self.definition
            .borrow()
            .clone()
            .ok_or_else(|| DispatchError::Uninitialized(self.name.clone()))
    }
}

impl Feature for Function {
    fn name(&self) -> &str {
        &self.name
    }

    fn holder(&self) -> &HolderRef {
        &self.holder
    }

    fn as_hideable(&self) -> Option<&dyn Hideable> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Hideable for Function {
    fn is_hidden(&self) -> bool {
        true
    }
}

impl Initializable for Function {
    fn is_initialized(&self) -> bool {
        self.definition.borrow().is_some()
    }

    fn initialize(&self, definition: Rc<dyn Any>) -> FeatureResult<()> {
        let definition = downcast_definition::<FunctionDefinition>(&self.name, definition)?;
        *self.definition.borrow_mut() = Some(definition);
        Ok(())
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("holder", &self.holder)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
