//! Collection properties: a stored list with `adder` and `remover` chains.

use crate::property::ReadStorage;
use crate::{
    Context, DefinitionEntry, DispatchError, DispatchResult, Executor, Handler, InvocationChain,
    Operations, ParamShape, Priority, StandardStorage, Storage, ADDER, GETTER, REMOVER,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use weave_core::{TypeId, Value, ValueType};
use weave_feature::{
    downcast_definition, Definition, Feature, FeatureError, FeatureResult, Hideable, HolderRef,
    Initializable, Persistable, ReferenceMode,
};

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Built-in adder: appends the element.
struct PushElement;

impl Executor for PushElement {
    fn execute(
        &self,
        chain: &mut InvocationChain<'_>,
        mut args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let element = args.pop().unwrap_or_default();
        let mut storage = chain.storage()?.borrow_mut();
        let mut items = into_items(storage.get());
        items.push(element);
        storage.set(Value::List(items))?;
        Ok(Value::Null)
    }
}

/// Built-in remover: drops the first equal element and reports whether one
/// was found.
struct RemoveElement;

impl Executor for RemoveElement {
    fn execute(
        &self,
        chain: &mut InvocationChain<'_>,
        mut args: Vec<Value>,
    ) -> DispatchResult<Value> {
        let element = args.pop().unwrap_or_default();
        let mut storage = chain.storage()?.borrow_mut();
        let mut items = into_items(storage.get());
        let Some(position) = items.iter().position(|item| *item == element) else {
            return Ok(Value::Bool(false));
        };
        items.remove(position);
        storage.set(Value::List(items))?;
        Ok(Value::Bool(true))
    }
}

/// Definition of a list-valued property.
#[derive(Debug)]
pub struct CollectionPropertyDefinition {
    operations: Operations,
    element_type: ValueType,
    initial: Vec<Value>,
    hidden: bool,
    persistent: bool,
    reference_mode: ReferenceMode,
    storage: Box<dyn Storage>,
    getter: ParamShape,
    element: ParamShape,
}

impl CollectionPropertyDefinition {
    pub fn element_type(&self) -> ValueType {
        self.element_type
    }

    pub fn initial(&self) -> &[Value] {
        &self.initial
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

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

    /// Register a `getter`, `adder` or `remover` handler.
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

/// Definitions are equal when they share a name and a declared element type.
impl PartialEq for CollectionPropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.operations.name() == other.operations.name() && self.element_type == other.element_type
    }
}

impl Definition for CollectionPropertyDefinition {
    type Feature = CollectionProperty;

    fn name(&self) -> &str {
        self.operations.name()
    }

    fn create(&self, holder: &HolderRef) -> CollectionProperty {
        CollectionProperty {
            name: self.name().to_string(),
            holder: holder.clone(),
            storage: RefCell::new(self.storage.reproduce()),
            hidden: Cell::new(self.hidden),
            persistent: Cell::new(self.persistent),
            definition: RefCell::new(None),
        }
    }
}

/// Builder for a [`CollectionPropertyDefinition`].
pub struct CollectionBuilder<'c> {
    context: &'c mut Context,
    name: String,
    element_type: ValueType,
    initial: Vec<Value>,
    hidden: bool,
    persistent: bool,
    reference_mode: ReferenceMode,
    storage: Box<dyn Storage>,
}

impl<'c> CollectionBuilder<'c> {
    pub(crate) fn new(context: &'c mut Context, name: String, element_type: ValueType) -> Self {
        Self {
            context,
            name,
            element_type,
            initial: Vec::new(),
            hidden: false,
            persistent: true,
            reference_mode: ReferenceMode::Reference,
            storage: Box::new(StandardStorage::new()),
        }
    }

    /// Elements stored when a feature is first initialized.
    pub fn initial<T: Into<Value>>(mut self, elements: impl IntoIterator<Item = T>) -> Self {
        self.initial = elements.into_iter().map(Into::into).collect();
        self
    }

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

    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn done(self) -> DispatchResult<Rc<CollectionPropertyDefinition>> {
        if let Some((index, bad)) = self
            .initial
            .iter()
            .enumerate()
            .find(|(_, value)| !self.element_type.accepts(value))
        {
            return Err(DispatchError::argument_type(
                index,
                self.element_type,
                bad.type_name(),
            ));
        }
        self.storage
            .reproduce()
            .set(Value::List(self.initial.clone()))?;

        let operations = self.context.operations(&self.name)?;
        operations.install_storage(GETTER, Rc::new(ReadStorage))?;
        operations.install_storage(ADDER, Rc::new(PushElement))?;
        operations.install_storage(REMOVER, Rc::new(RemoveElement))?;

        let definition = Rc::new(CollectionPropertyDefinition {
            operations,
            element_type: self.element_type,
            initial: self.initial,
            hidden: self.hidden,
            persistent: self.persistent,
            reference_mode: self.reference_mode,
            storage: self.storage,
            getter: ParamShape::none(),
            element: ParamShape::fixed([self.element_type]),
        });
        self.context
            .register(DefinitionEntry::Collection(Rc::clone(&definition)))?;
        Ok(definition)
    }
}

/// A collection property attached to one entity.
pub struct CollectionProperty {
    name: String,
    holder: HolderRef,
    storage: RefCell<Box<dyn Storage>>,
    hidden: Cell<bool>,
    persistent: Cell<bool>,
    definition: RefCell<Option<Rc<CollectionPropertyDefinition>>>,
}

impl CollectionProperty {
    /// Run the getter chain; a `Null` result reads as an empty list.
    pub fn get(&self) -> DispatchResult<Vec<Value>> {
        let definition = self.definition()?;
        let value = definition.operations.dispatch(
            GETTER,
            &definition.getter,
            &self.holder,
            Some(&self.storage),
            Vec::new(),
        )?;
        Ok(into_items(value))
    }

    /// Run the adder chain.
    pub fn add(&self, element: impl Into<Value>) -> DispatchResult<()> {
        let definition = self.definition()?;
        definition.operations.dispatch(
            ADDER,
            &definition.element,
            &self.holder,
            Some(&self.storage),
            vec![element.into()],
        )?;
        Ok(())
    }

    /// Run the remover chain; true if an element was removed.
    pub fn remove(&self, element: impl Into<Value>) -> DispatchResult<bool> {
        let definition = self.definition()?;
        let removed = definition.operations.dispatch(
            REMOVER,
            &definition.element,
            &self.holder,
            Some(&self.storage),
            vec![element.into()],
        )?;
        Ok(removed.as_bool().unwrap_or(false))
    }

    /// Run the remover chain once for every current element.
    pub fn clear(&self) -> DispatchResult<()> {
        for element in self.get()? {
            self.remove(element)?;
        }
        Ok(())
    }

    pub fn len(&self) -> DispatchResult<usize> {
        Ok(self.get()?.len())
    }

    pub fn is_empty(&self) -> DispatchResult<bool> {
        Ok(self.get()?.is_empty())
    }

    pub fn contains(&self, element: &Value) -> DispatchResult<bool> {
        Ok(self.get()?.contains(element))
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
        if let Some(entity) = self.holder.upgrade() {
            entity.features().touch(&self.name);
        }
    }

    pub fn set_persistent(&self, persistent: bool) {
        self.persistent.set(persistent);
    }

    pub fn definition(&self) -> DispatchResult<Rc<CollectionPropertyDefinition>> {
        self.definition
            .borrow()
            .clone()
            .ok_or_else(|| DispatchError::Uninitialized(self.name.clone()))
    }
}

impl Feature for CollectionProperty {
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

impl Hideable for CollectionProperty {
    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }
}

impl Persistable for CollectionProperty {
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
        Value::List(into_items(self.storage.borrow().get()))
    }

    fn import(&self, value: Value) -> FeatureResult<()> {
        if !value.is_list() {
            return Err(FeatureError::import(
                &self.name,
                format!("expected a list, got {}", value.type_name()),
            ));
        }
        self.storage
            .borrow_mut()
            .set(value)
            .map_err(|err| FeatureError::import(&self.name, err.to_string()))
    }
}

impl Initializable for CollectionProperty {
    fn is_initialized(&self) -> bool {
        self.definition.borrow().is_some()
    }

    fn initialize(&self, definition: Rc<dyn Any>) -> FeatureResult<()> {
        let definition =
            downcast_definition::<CollectionPropertyDefinition>(&self.name, definition)?;
        self.storage
            .borrow_mut()
            .set(Value::List(definition.initial.clone()))
            .map_err(|err| FeatureError::initialization(&self.name, err.to_string()))?;
        *self.definition.borrow_mut() = Some(definition);
        Ok(())
    }
}

impl std::fmt::Debug for CollectionProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionProperty")
            .field("name", &self.name)
            .field("holder", &self.holder)
            .field("items", &self.storage.borrow().get())
            .field("hidden", &self.hidden.get())
            .finish()
    }
}
