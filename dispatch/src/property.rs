//! Properties: `getter`/`setter` chains ending in a storage read or write.

use crate::{
    Context, DefinitionEntry, DispatchError, DispatchResult, Executor, Handler, InvocationChain,
    Operations, ParamShape, Priority, StandardStorage, Storage, GETTER, SETTER,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use weave_core::{TypeId, Value, ValueType};
use weave_feature::{
    downcast_definition, Definition, Feature, FeatureError, FeatureResult, Hideable, HolderRef,
    Initializable, Persistable, ReferenceMode,
};

/// Built-in getter: returns the stored value.
pub(crate) struct ReadStorage;

impl Executor for ReadStorage {
    fn execute(
        &self,
        chain: &mut InvocationChain<'_>,
        _args: Vec<Value>,
    ) -> DispatchResult<Value> {
        Ok(chain.storage()?.borrow().get())
    }
}

/// Built-in setter: replaces the stored value.
struct WriteStorage;

impl Executor for WriteStorage {
    fn execute(
        &self,
        chain: &mut InvocationChain<'_>,
        mut args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let value = args.pop().unwrap_or_default();
        chain.storage()?.borrow_mut().set(value)?;
        Ok(Value::Null)
    }
}

/// Definition of a single-valued property.
#[derive(Debug)]
pub struct PropertyDefinition {
    operations: Operations,
    value_type: ValueType,
    initial: Value,
    hidden: bool,
    persistent: bool,
    reference_mode: ReferenceMode,
    storage: Box<dyn Storage>,
    getter: ParamShape,
    setter: ParamShape,
}

impl PropertyDefinition {
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn initial(&self) -> &Value {
        &self.initial
    }

    /// Whether new features start hidden.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether new features start persistent.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// How entity references held by this property are persisted.
    pub fn reference_mode(&self) -> ReferenceMode {
        self.reference_mode
    }

    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    /// Register a `getter` or `setter` handler.
    pub fn add_handler(
        &self,
        operation: &str,
        name: &str,
        variant: TypeId,
        handler: Handler,
        priority: impl Into<Priority>,
    ) -> DispatchResult<()> {
        self.operations
            .add_handler(operation, name, variant, handler, priority.into())
    }

    pub fn add_default_handler(
        &self,
        operation: &str,
        name: &str,
        variant: TypeId,
        handler: Handler,
    ) -> DispatchResult<()> {
        let priority = self.operations.config().default_priority;
        self.add_handler(operation, name, variant, handler, priority)
    }

    pub fn remove_handler(&self, operation: &str, name: &str, variant: TypeId) -> bool {
        self.operations.remove_handler(operation, name, variant)
    }
}

/// Definitions are equal when they share a name and a declared value type.
impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.operations.name() == other.operations.name() && self.value_type == other.value_type
    }
}

impl Definition for PropertyDefinition {
    type Feature = Property;

    fn name(&self) -> &str {
        self.operations.name()
    }

    fn create(&self, holder: &HolderRef) -> Property {
        Property {
            name: self.name().to_string(),
            holder: holder.clone(),
            storage: RefCell::new(self.storage.reproduce()),
            hidden: Cell::new(self.hidden),
            persistent: Cell::new(self.persistent),
            definition: RefCell::new(None),
        }
    }
}

/// Builder for a [`PropertyDefinition`], registered with its context on
/// [`done`](PropertyBuilder::done).
pub struct PropertyBuilder<'c> {
    context: &'c mut Context,
    name: String,
    value_type: ValueType,
    initial: Value,
    hidden: bool,
    persistent: bool,
    reference_mode: ReferenceMode,
    storage: Box<dyn Storage>,
}

impl<'c> PropertyBuilder<'c> {
    pub(crate) fn new(context: &'c mut Context, name: String, value_type: ValueType) -> Self {
        Self {
            context,
            name,
            value_type,
            initial: Value::Null,
            hidden: false,
            persistent: true,
            reference_mode: ReferenceMode::Reference,
            storage: Box::new(StandardStorage::new()),
        }
    }

    /// Value stored when a feature is first initialized.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = value.into();
        self
    }

    /// Features start hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Persist referenced entities by id or as embedded copies.
    pub fn reference_mode(mut self, mode: ReferenceMode) -> Self {
        self.reference_mode = mode;
        self
    }

    /// Prototype reproduced for every feature.
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn done(self) -> DispatchResult<Rc<PropertyDefinition>> {
        if !self.value_type.accepts(&self.initial) {
            return Err(DispatchError::argument_type(
                0,
                self.value_type,
                self.initial.type_name(),
            ));
        }
        self.storage.reproduce().set(self.initial.clone())?;

        let operations = self.context.operations(&self.name)?;
        operations.install_storage(GETTER, Rc::new(ReadStorage))?;
        operations.install_storage(SETTER, Rc::new(WriteStorage))?;

        let definition = Rc::new(PropertyDefinition {
            operations,
            value_type: self.value_type,
            initial: self.initial,
            hidden: self.hidden,
            persistent: self.persistent,
            reference_mode: self.reference_mode,
            storage: self.storage,
            getter: ParamShape::none(),
            setter: ParamShape::fixed([self.value_type]),
        });
        self.context
            .register(DefinitionEntry::Property(Rc::clone(&definition)))?;
        Ok(definition)
    }
}

/// A property attached to one entity.
pub struct Property {
    name: String,
    holder: HolderRef,
    storage: RefCell<Box<dyn Storage>>,
    hidden: Cell<bool>,
    persistent: Cell<bool>,
    definition: RefCell<Option<Rc<PropertyDefinition>>>,
}

impl Property {
    /// Run the getter chain.
    pub fn get(&self) -> DispatchResult<Value> {
        let definition = self.definition()?;
        definition.operations.dispatch(
            GETTER,
            &definition.getter,
            &self.holder,
            Some(&self.storage),
            Vec::new(),
        )
    }

    /// Run the setter chain.
    pub fn set(&self, value: impl Into<Value>) -> DispatchResult<()> {
        let definition = self.definition()?;
        definition.operations.dispatch(
            SETTER,
            &definition.setter,
            &self.holder,
            Some(&self.storage),
            vec![value.into()],
        )?;
        Ok(())
    }

    /// Hide or show this property; the holder's visibility index is updated
    /// right away.
    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
        if let Some(entity) = self.holder.upgrade() {
            entity.features().touch(&self.name);
        }
    }

    pub fn set_persistent(&self, persistent: bool) {
        self.persistent.set(persistent);
    }

    pub fn definition(&self) -> DispatchResult<Rc<PropertyDefinition>> {
        self.definition
            .borrow()
            .clone()
            .ok_or_else(|| DispatchError::Uninitialized(self.name.clone()))
    }
}

impl Feature for Property {
    fn name(&self) -> &str {
        &self.name
    }

    fn holder(&self) -> &HolderRef {
        &self.holder
    }

    fn state(&self) -> Option<Value> {
        Some(self.storage.borrow().get())
    }

    fn as_hideable(&self) -> Option<&dyn Hideable> {
        Some(self)
    }

    fn as_persistable(&self) -> Option<&dyn Persistable> {
        Some(self)
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Hideable for Property {
    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }
}

impl Persistable for Property {
    fn is_persistent(&self) -> bool {
        self.persistent.get()
    }

    fn reference_mode(&self) -> ReferenceMode {
        self.definition
            .borrow()
            .as_ref()
            .map_or(ReferenceMode::Reference, |definition| definition.reference_mode)
    }

    fn export(&self) -> Value {
        self.storage.borrow().get()
    }

    fn import(&self, value: Value) -> FeatureResult<()> {
        self.storage
            .borrow_mut()
            .set(value)
            .map_err(|err| FeatureError::import(&self.name, err.to_string()))
    }
}

impl Initializable for Property {
    fn is_initialized(&self) -> bool {
        self.definition.borrow().is_some()
    }

    fn initialize(&self, definition: Rc<dyn Any>) -> FeatureResult<()> {
        let definition = downcast_definition::<PropertyDefinition>(&self.name, definition)?;
        self.storage
            .borrow_mut()
            .set(definition.initial.clone())
            .map_err(|err| FeatureError::initialization(&self.name, err.to_string()))?;
        *self.definition.borrow_mut() = Some(definition);
        Ok(())
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("holder", &self.holder)
            .field("value", &self.storage.borrow().get())
            .field("hidden", &self.hidden.get())
            .finish()
    }
}
