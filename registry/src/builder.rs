//! HierarchyBuilder for constructing an immutable TypeHierarchy.

use crate::{SubtypeIndex, TypeDef, TypeHierarchy};
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use weave_core::TypeId;

/// Identifier shape shared by type names and definition names.
const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.\-]*$";

/// Errors that can occur while building the hierarchy or registering names.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateTypeName(String),

    #[error("Unknown parent type: {0}")]
    UnknownParentType(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// The compiled [`NAME_PATTERN`], built on first use.
fn name_regex() -> Result<&'static Regex, &'static str> {
    static NAME_RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    NAME_RE
        .get_or_init(|| Regex::new(NAME_PATTERN).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(String::as_str)
}

/// Check that a type or definition name is a plain identifier.
pub fn validate_name(name: &str) -> RegistryResult<()> {
    let re = name_regex().map_err(|reason| RegistryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidName {
            name: name.to_string(),
            reason: format!("must match {}", NAME_PATTERN),
        })
    }
}

/// Builder for constructing an immutable TypeHierarchy.
///
/// Parents must be declared before their children, so the resulting
/// hierarchy is always acyclic.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    /// Next type ID to allocate.
    next_type_id: u32,
    /// Types being built.
    types: HashMap<TypeId, TypeDef>,
    /// Type name to ID mapping.
    type_names: HashMap<String, TypeId>,
}

impl HierarchyBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder seeded with existing types; new IDs continue after theirs.
    pub(crate) fn seeded(types: HashMap<TypeId, TypeDef>) -> Self {
        let next_type_id = types.keys().map(|id| id.raw() + 1).max().unwrap_or(0);
        let type_names = types
            .values()
            .map(|def| (def.name.clone(), def.id))
            .collect();
        Self {
            next_type_id,
            types,
            type_names,
        }
    }

    /// Add a type definition.
    pub fn add_type(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        TypeBuilder {
            builder: self,
            name: name.into(),
            parent_names: Vec::new(),
        }
    }

    /// Look up the ID of a type declared so far.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Build the immutable TypeHierarchy.
    pub fn build(self) -> RegistryResult<TypeHierarchy> {
        let subtype_index = SubtypeIndex::build(&self.types);
        tracing::debug!(types = self.types.len(), "built type hierarchy");
        Ok(TypeHierarchy::new(self.types, self.type_names, subtype_index))
    }
}

/// Builder for a type definition.
pub struct TypeBuilder<'a> {
    builder: &'a mut HierarchyBuilder,
    name: String,
    parent_names: Vec<String>,
}

impl<'a> TypeBuilder<'a> {
    /// Add a parent type by name.
    pub fn extends(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_names.push(parent_name.into());
        self
    }

    /// Finish building this type.
    pub fn done(self) -> RegistryResult<TypeId> {
        validate_name(&self.name)?;

        if self.builder.type_names.contains_key(&self.name) {
            return Err(RegistryError::DuplicateTypeName(self.name));
        }

        let mut parent_ids = Vec::new();
        for parent_name in &self.parent_names {
            match self.builder.type_names.get(parent_name) {
                Some(&parent_id) => parent_ids.push(parent_id),
                None => return Err(RegistryError::UnknownParentType(parent_name.clone())),
            }
        }

        let id = TypeId::new(self.builder.next_type_id);
        self.builder.next_type_id += 1;

        let type_def = TypeDef {
            id,
            name: self.name.clone(),
            parent_ids,
        };

        self.builder.type_names.insert(self.name, id);
        self.builder.types.insert(id, type_def);

        Ok(id)
    }
}
