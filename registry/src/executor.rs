//! Executor registry - variant-aware handler registration and resolution.
//!
//! Handlers are registered under a sub-operation (`invoke`, `getter`, ...),
//! a handler name and a variant type. Resolving for a concrete type picks,
//! per (sub-operation, name), the most specific registered variant the type
//! descends from, then orders each sub-operation's handlers by descending
//! priority. Resolutions are cached per concrete type and the whole cache is
//! dropped on any registration change.

use crate::{validate_name, Priority, RegistryError, RegistryResult, TieBreak, TypeHierarchy};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use weave_core::TypeId;

/// A handler stored for one variant.
#[derive(Clone)]
struct Slot<H> {
    handler: H,
    priority: Priority,
    seq: u64,
}

/// Sub-operation -> handler name -> variant -> slot.
type Table<H> = BTreeMap<String, BTreeMap<String, HashMap<TypeId, Slot<H>>>>;

/// A handler selected for a concrete type.
#[derive(Clone)]
pub struct Registered<H> {
    /// Handler name.
    pub name: String,
    /// Variant the handler was registered against.
    pub variant: TypeId,
    /// Execution priority.
    pub priority: Priority,
    /// Registration sequence number (for tie-breaking).
    pub seq: u64,
    /// The handler itself.
    pub handler: H,
}

impl<H> fmt::Debug for Registered<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("name", &self.name)
            .field("variant", &self.variant)
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .finish()
    }
}

/// The resolved, priority-ordered handler chains for one concrete type.
pub struct Resolution<H> {
    concrete: TypeId,
    chains: BTreeMap<String, Vec<Registered<H>>>,
}

impl<H> Resolution<H> {
    /// The concrete type this resolution was computed for.
    pub fn concrete(&self) -> TypeId {
        self.concrete
    }

    /// Handlers for a sub-operation, highest priority first.
    pub fn chain(&self, operation: &str) -> &[Registered<H>] {
        self.chains
            .get(operation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Names of the handlers for a sub-operation, in execution order.
    pub fn handler_names(&self, operation: &str) -> Vec<&str> {
        self.chain(operation)
            .iter()
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Sub-operations with at least one applicable handler.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl<H> fmt::Debug for Resolution<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("concrete", &self.concrete)
            .field("chains", &self.chains)
            .finish()
    }
}

/// Per-definition handler table with a per-concrete-type resolution cache.
pub struct ExecutorRegistry<H> {
    hierarchy: Rc<TypeHierarchy>,
    tie_break: TieBreak,
    table: RefCell<Table<H>>,
    next_seq: Cell<u64>,
    cache: RefCell<HashMap<TypeId, Rc<Resolution<H>>>>,
}

impl<H: Clone> ExecutorRegistry<H> {
    /// Create an empty registry resolving against `hierarchy`.
    pub fn new(hierarchy: Rc<TypeHierarchy>, tie_break: TieBreak) -> Self {
        Self {
            hierarchy,
            tie_break,
            table: RefCell::new(BTreeMap::new()),
            next_seq: Cell::new(0),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The hierarchy variants are resolved against.
    pub fn hierarchy(&self) -> &Rc<TypeHierarchy> {
        &self.hierarchy
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Register `handler` for `variant`, replacing an earlier registration of
    /// the same (operation, name, variant).
    pub fn add_handler(
        &self,
        operation: &str,
        name: &str,
        variant: TypeId,
        handler: H,
        priority: Priority,
    ) -> RegistryResult<()> {
        validate_name(operation)?;
        validate_name(name)?;
        if !self.hierarchy.contains(variant) {
            return Err(RegistryError::UnknownType(variant.to_string()));
        }

        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let replaced = self
            .table
            .borrow_mut()
            .entry(operation.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .insert(
                variant,
                Slot {
                    handler,
                    priority,
                    seq,
                },
            )
            .is_some();

        tracing::debug!(
            operation,
            handler = name,
            variant = %self.hierarchy.type_name(variant),
            %priority,
            replaced,
            "registered handler"
        );
        self.invalidate();
        Ok(())
    }

    /// Remove the registration for (operation, name, variant).
    ///
    /// Returns true if a handler was removed.
    pub fn remove_handler(&self, operation: &str, name: &str, variant: TypeId) -> bool {
        let removed = {
            let mut table = self.table.borrow_mut();
            let Some(names) = table.get_mut(operation) else {
                return false;
            };
            let Some(variants) = names.get_mut(name) else {
                return false;
            };
            let removed = variants.remove(&variant).is_some();
            if variants.is_empty() {
                names.remove(name);
            }
            if names.is_empty() {
                table.remove(operation);
            }
            removed
        };

        if removed {
            tracing::debug!(
                operation,
                handler = name,
                variant = %self.hierarchy.type_name(variant),
                "removed handler"
            );
            self.invalidate();
        }
        removed
    }

    /// Resolve the handler chains that apply to `concrete`.
    pub fn resolve_for(&self, concrete: TypeId) -> Rc<Resolution<H>> {
        if let Some(cached) = self.cache.borrow().get(&concrete) {
            return Rc::clone(cached);
        }

        let resolution = Rc::new(self.compute(concrete));
        self.cache
            .borrow_mut()
            .insert(concrete, Rc::clone(&resolution));
        resolution
    }

    fn compute(&self, concrete: TypeId) -> Resolution<H> {
        let table = self.table.borrow();
        let mut chains = BTreeMap::new();

        for (operation, names) in table.iter() {
            let mut chain: Vec<Registered<H>> = names
                .iter()
                .filter_map(|(name, variants)| {
                    let variant = self
                        .hierarchy
                        .most_specific(concrete, variants.keys().copied())?;
                    let slot = variants.get(&variant)?;
                    Some(Registered {
                        name: name.clone(),
                        variant,
                        priority: slot.priority,
                        seq: slot.seq,
                        handler: slot.handler.clone(),
                    })
                })
                .collect();

            if chain.is_empty() {
                continue;
            }

            chain.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| self.tie_break.compare(a.seq, b.seq))
            });
            chains.insert(operation.clone(), chain);
        }

        tracing::debug!(
            concrete = %self.hierarchy.type_name(concrete),
            operations = chains.len(),
            "resolved handlers"
        );
        Resolution { concrete, chains }
    }

    fn invalidate(&self) {
        let mut cache = self.cache.borrow_mut();
        if !cache.is_empty() {
            tracing::debug!(entries = cache.len(), "invalidated resolution cache");
            cache.clear();
        }
    }

    /// Whether a resolution for `concrete` is currently cached.
    pub fn is_cached(&self, concrete: TypeId) -> bool {
        self.cache.borrow().contains_key(&concrete)
    }

    /// Total number of (operation, name, variant) registrations.
    pub fn handler_count(&self) -> usize {
        self.table
            .borrow()
            .values()
            .flat_map(|names| names.values())
            .map(HashMap::len)
            .sum()
    }

    /// Sub-operations with at least one registration.
    pub fn operations(&self) -> Vec<String> {
        self.table.borrow().keys().cloned().collect()
    }
}

impl<H> fmt::Debug for ExecutorRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("operations", &self.table.borrow().keys().collect::<Vec<_>>())
            .field("cached_types", &self.cache.borrow().len())
            .field("tie_break", &self.tie_break)
            .finish()
    }
}
