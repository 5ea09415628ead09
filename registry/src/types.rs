//! Type hierarchy definition types.

use std::collections::{HashMap, HashSet};
use weave_core::TypeId;

/// Entity type definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Unique identifier.
    pub id: TypeId,
    /// Type name.
    pub name: String,
    /// Parent type IDs (for inheritance).
    pub parent_ids: Vec<TypeId>,
}

impl TypeDef {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_ids: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: TypeId) -> Self {
        self.parent_ids.push(parent);
        self
    }

    /// Returns true if this type has no parents.
    pub fn is_root(&self) -> bool {
        self.parent_ids.is_empty()
    }
}

/// Precomputed subtype relationships.
#[derive(Debug, Default)]
pub struct SubtypeIndex {
    /// For each type, the set of all its subtypes (transitive).
    subtypes: HashMap<TypeId, HashSet<TypeId>>,
    /// For each type, the set of all its supertypes (transitive).
    supertypes: HashMap<TypeId, HashSet<TypeId>>,
}

impl SubtypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the subtype index from type definitions.
    pub fn build(types: &HashMap<TypeId, TypeDef>) -> Self {
        let mut index = Self::new();

        for &type_id in types.keys() {
            index.subtypes.insert(type_id, HashSet::new());
            index.supertypes.insert(type_id, HashSet::new());
        }

        // Direct parents first
        for (type_id, type_def) in types {
            for &parent_id in &type_def.parent_ids {
                if let Some(parent_subtypes) = index.subtypes.get_mut(&parent_id) {
                    parent_subtypes.insert(*type_id);
                }
                if let Some(type_supertypes) = index.supertypes.get_mut(type_id) {
                    type_supertypes.insert(parent_id);
                }
            }
        }

        // Transitively close until nothing changes
        let type_ids: Vec<TypeId> = types.keys().copied().collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &type_id in &type_ids {
                let supertypes: Vec<TypeId> = index
                    .supertypes
                    .get(&type_id)
                    .map(|s| s.iter().copied().collect())
                    .unwrap_or_default();

                for super_id in supertypes {
                    let transitive: Vec<TypeId> = index
                        .supertypes
                        .get(&super_id)
                        .map(|s| s.iter().copied().collect())
                        .unwrap_or_default();

                    for trans_id in transitive {
                        if let Some(set) = index.supertypes.get_mut(&type_id) {
                            if set.insert(trans_id) {
                                changed = true;
                            }
                        }
                        if let Some(set) = index.subtypes.get_mut(&trans_id) {
                            set.insert(type_id);
                        }
                    }
                }
            }
        }

        index
    }

    /// Check if `sub` is a subtype of `super_type`. Every type is a subtype of itself.
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        if sub == super_type {
            return true;
        }
        self.supertypes
            .get(&sub)
            .map(|set| set.contains(&super_type))
            .unwrap_or(false)
    }

    /// Number of (transitive) supertypes of a type.
    pub fn depth(&self, type_id: TypeId) -> usize {
        self.supertypes.get(&type_id).map(HashSet::len).unwrap_or(0)
    }

    /// Get all subtypes of a type (not including the type itself).
    pub fn get_subtypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get all supertypes of a type (not including the type itself).
    pub fn get_supertypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.supertypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}
