//! The TypeHierarchy - immutable type lookup.

use crate::{HierarchyBuilder, RegistryError, RegistryResult, SubtypeIndex, TypeDef};
use std::collections::HashMap;
use weave_core::TypeId;

/// The TypeHierarchy provides runtime lookup of entity types and their
/// ancestor relation. It is immutable after construction.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    /// Type definitions by ID.
    types: HashMap<TypeId, TypeDef>,
    /// Type ID lookup by name.
    type_names: HashMap<String, TypeId>,
    /// Precomputed subtype relationships.
    subtype_index: SubtypeIndex,
}

impl TypeHierarchy {
    pub(crate) fn new(
        types: HashMap<TypeId, TypeDef>,
        type_names: HashMap<String, TypeId>,
        subtype_index: SubtypeIndex,
    ) -> Self {
        Self {
            types,
            type_names,
            subtype_index,
        }
    }

    /// Start a builder containing every type of this hierarchy.
    pub fn extend(&self) -> HierarchyBuilder {
        HierarchyBuilder::seeded(self.types.clone())
    }

    // ==================== Type Lookups ====================

    /// Get a type definition by name.
    pub fn get_type_by_name(&self, name: &str) -> Option<&TypeDef> {
        self.type_names.get(name).and_then(|id| self.types.get(id))
    }

    /// Get a type definition by ID.
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(&id)
    }

    /// Get a type ID by name.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Get a type ID by name, failing if it is not declared.
    pub fn require_type(&self, name: &str) -> RegistryResult<TypeId> {
        self.get_type_id(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Get the name of a type, or its ID rendered as text if unknown.
    pub fn type_name(&self, id: TypeId) -> String {
        self.types
            .get(&id)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Check whether a type ID is declared.
    pub fn contains(&self, id: TypeId) -> bool {
        self.types.contains_key(&id)
    }

    /// Get all type definitions.
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Get the number of types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ==================== Subtype Queries ====================

    /// Check if `sub` is a subtype of `super_type` (or the same type).
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        self.subtype_index.is_subtype(sub, super_type)
    }

    /// Number of ancestors of a type; deeper types are more specific.
    pub fn depth(&self, type_id: TypeId) -> usize {
        self.subtype_index.depth(type_id)
    }

    /// Get all subtypes of a type (not including the type itself).
    pub fn get_subtypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtype_index.get_subtypes(type_id)
    }

    /// Get all supertypes of a type (not including the type itself).
    pub fn get_supertypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtype_index.get_supertypes(type_id)
    }

    /// Pick the most specific candidate that `concrete` is a subtype of.
    ///
    /// A qualifying candidate wins when no other qualifying candidate is a
    /// strict descendant of it. Incomparable survivors (possible with multiple
    /// parents) are ordered by depth, then by lowest ID.
    pub fn most_specific<I>(&self, concrete: TypeId, candidates: I) -> Option<TypeId>
    where
        I: IntoIterator<Item = TypeId>,
    {
        let qualifying: Vec<TypeId> = candidates
            .into_iter()
            .filter(|&candidate| self.is_subtype(concrete, candidate))
            .collect();

        qualifying
            .iter()
            .copied()
            .filter(|&candidate| {
                !qualifying
                    .iter()
                    .any(|&other| other != candidate && self.is_subtype(other, candidate))
            })
            .min_by(|&a, &b| {
                self.depth(b)
                    .cmp(&self.depth(a))
                    .then_with(|| a.raw().cmp(&b.raw()))
            })
    }
}
