//! The setup context: type hierarchy, configuration and definition catalog.

use crate::{
    CollectionBuilder, CollectionPropertyDefinition, DispatchError, DispatchResult,
    FunctionDefinition, Operations, ParamShape, PropertyBuilder, PropertyDefinition, WeaveConfig,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use weave_core::{EntityId, TypeId, ValueType};
use weave_feature::{Entity, Feature};
use weave_registry::{RegistryError, TypeHierarchy};

/// A cataloged definition of any kind.
#[derive(Debug, Clone)]
pub enum DefinitionEntry {
    Function(Rc<FunctionDefinition>),
    Property(Rc<PropertyDefinition>),
    Collection(Rc<CollectionPropertyDefinition>),
}

impl DefinitionEntry {
    pub fn name(&self) -> &str {
        match self {
            DefinitionEntry::Function(def) => def.operations().name(),
            DefinitionEntry::Property(def) => def.operations().name(),
            DefinitionEntry::Collection(def) => def.operations().name(),
        }
    }

    pub fn operations(&self) -> &Operations {
        match self {
            DefinitionEntry::Function(def) => def.operations(),
            DefinitionEntry::Property(def) => def.operations(),
            DefinitionEntry::Collection(def) => def.operations(),
        }
    }

    /// Fetch-or-create this definition's feature on `entity`.
    pub fn fetch(&self, entity: &Entity) -> DispatchResult<Rc<dyn Feature>> {
        let feature: Rc<dyn Feature> = match self {
            DefinitionEntry::Function(def) => entity.get(def)?,
            DefinitionEntry::Property(def) => entity.get(def)?,
            DefinitionEntry::Collection(def) => entity.get(def)?,
        };
        Ok(feature)
    }
}

/// Owns everything set up before entities are used.
pub struct Context {
    hierarchy: Rc<TypeHierarchy>,
    config: WeaveConfig,
    next_entity_id: Cell<u64>,
    /// Every id handed out so far, including restored ones. Dropped
    /// entities keep their id reserved.
    issued: RefCell<HashMap<EntityId, Weak<Entity>>>,
    definitions: BTreeMap<String, DefinitionEntry>,
}

impl Context {
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self::with_config(hierarchy, WeaveConfig::default())
    }

    pub fn with_config(hierarchy: TypeHierarchy, config: WeaveConfig) -> Self {
        Self {
            hierarchy: Rc::new(hierarchy),
            config,
            next_entity_id: Cell::new(0),
            issued: RefCell::new(HashMap::new()),
            definitions: BTreeMap::new(),
        }
    }

    pub fn hierarchy(&self) -> &Rc<TypeHierarchy> {
        &self.hierarchy
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// Look up a type by name.
    pub fn type_id(&self, name: &str) -> DispatchResult<TypeId> {
        Ok(self.hierarchy.require_type(name)?)
    }

    // ==================== Definitions ====================

    /// Create and catalog a function definition.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        shape: ParamShape,
    ) -> DispatchResult<Rc<FunctionDefinition>> {
        let name = name.into();
        let operations = self.operations(&name)?;
        let definition = Rc::new(FunctionDefinition::new(operations, shape));
        self.register(DefinitionEntry::Function(Rc::clone(&definition)))?;
        Ok(definition)
    }

    /// Start a property definition; cataloged by [`PropertyBuilder::done`].
    pub fn property(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
    ) -> PropertyBuilder<'_> {
        PropertyBuilder::new(self, name.into(), value_type)
    }

    /// Start a collection property definition; cataloged by
    /// [`CollectionBuilder::done`].
    pub fn collection_property(
        &mut self,
        name: impl Into<String>,
        element_type: ValueType,
    ) -> CollectionBuilder<'_> {
        CollectionBuilder::new(self, name.into(), element_type)
    }

    pub fn definition(&self, name: &str) -> Option<&DefinitionEntry> {
        self.definitions.get(name)
    }

    /// All definitions, ordered by name.
    pub fn definitions(&self) -> impl Iterator<Item = &DefinitionEntry> {
        self.definitions.values()
    }

    /// Operations table for a new definition named `name`.
    pub(crate) fn operations(&self, name: &str) -> DispatchResult<Operations> {
        if self.definitions.contains_key(name) {
            return Err(DispatchError::DuplicateDefinition(name.to_string()));
        }
        Operations::new(name, Rc::clone(&self.hierarchy), self.config)
    }

    pub(crate) fn register(&mut self, entry: DefinitionEntry) -> DispatchResult<()> {
        let name = entry.name().to_string();
        if self.definitions.contains_key(&name) {
            return Err(DispatchError::DuplicateDefinition(name));
        }
        tracing::debug!(definition = %name, "registered definition");
        self.definitions.insert(name, entry);
        Ok(())
    }

    // ==================== Entities ====================

    /// Create an entity of the named type.
    pub fn spawn(&self, type_name: &str) -> DispatchResult<Rc<Entity>> {
        let type_id = self.type_id(type_name)?;
        self.spawn_typed(type_id)
    }

    pub fn spawn_typed(&self, type_id: TypeId) -> DispatchResult<Rc<Entity>> {
        let id = EntityId::new(self.next_entity_id.get());
        self.spawn_with_id(id, type_id)
    }

    /// Create an entity with a known id; later spawns continue after it.
    ///
    /// Fails if this context already handed out `id`.
    pub fn spawn_with_id(&self, id: EntityId, type_id: TypeId) -> DispatchResult<Rc<Entity>> {
        if !self.hierarchy.contains(type_id) {
            return Err(RegistryError::UnknownType(type_id.to_string()).into());
        }
        if self.issued.borrow().contains_key(&id) {
            return Err(DispatchError::DuplicateEntity(id));
        }
        if id.raw() >= self.next_entity_id.get() {
            let next = id
                .raw()
                .checked_add(1)
                .ok_or(DispatchError::EntityIdsExhausted(id))?;
            self.next_entity_id.set(next);
        }
        let entity = Entity::new(id, type_id);
        self.issued.borrow_mut().insert(id, Rc::downgrade(&entity));
        tracing::debug!(entity = %id, type_id = %type_id, "spawned entity");
        Ok(entity)
    }

    /// Whether `id` was handed out by this context.
    pub fn is_issued(&self, id: EntityId) -> bool {
        self.issued.borrow().contains_key(&id)
    }

    /// A live entity spawned by this context.
    pub fn entity(&self, id: EntityId) -> Option<Rc<Entity>> {
        self.issued.borrow().get(&id).and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("types", &self.hierarchy.type_count())
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
