//! Entities (feature holders) and the back-references features keep to them.

use crate::{Definition, FeatureRegistry, FeatureResult};
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use weave_core::{EntityId, TypeId};

/// The object features attach to.
///
/// Identity (`id`) is stable and independent of the attached features;
/// equality and hashing only look at the visible features.
pub struct Entity {
    /// Unique identifier for this entity.
    id: EntityId,
    /// Concrete type, used for handler variant resolution.
    type_id: TypeId,
    /// Attached features.
    features: FeatureRegistry,
    /// Marked "do not persist" for snapshot collaborators.
    transient: Cell<bool>,
    self_ref: Weak<Entity>,
}

impl Entity {
    /// Create a new entity with no features.
    pub fn new(id: EntityId, type_id: TypeId) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            id,
            type_id,
            features: FeatureRegistry::new(),
            transient: Cell::new(false),
            self_ref: self_ref.clone(),
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fetch-or-create the feature for `definition`.
    pub fn get<D: Definition>(&self, definition: &Rc<D>) -> FeatureResult<Rc<D::Feature>> {
        self.features.get(&self.holder(), definition)
    }

    /// The feature registry, for iteration by collaborators.
    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// A back-reference handed to features created for this entity.
    pub fn holder(&self) -> HolderRef {
        HolderRef {
            id: self.id,
            type_id: self.type_id,
            entity: self.self_ref.clone(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.transient.get()
    }

    /// Mark this entity as "do not persist".
    pub fn set_transient(&self, transient: bool) {
        self.transient.set(transient);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.features.visible_eq(&other.features)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.features.visible_hash());
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("features", &self.features)
            .finish()
    }
}

/// A feature's handle on the entity it belongs to.
#[derive(Clone)]
pub struct HolderRef {
    id: EntityId,
    type_id: TypeId,
    entity: Weak<Entity>,
}

impl HolderRef {
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Concrete type of the holder.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The holder, unless it has been dropped.
    pub fn upgrade(&self) -> Option<Rc<Entity>> {
        self.entity.upgrade()
    }
}

impl fmt::Debug for HolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolderRef")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .finish()
    }
}
