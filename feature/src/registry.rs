//! The FeatureRegistry - lazy, per-entity feature storage.

use crate::{Definition, Feature, FeatureError, FeatureResult, HolderRef, VisibilityIndex};
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Maps feature names to the feature instances of one entity.
#[derive(Default)]
pub struct FeatureRegistry {
    /// Features by name (visible and hidden).
    features: RefCell<BTreeMap<String, Rc<dyn Feature>>>,
    /// Names of the features that take part in equality.
    visibility: RefCell<VisibilityIndex>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the feature for `definition`, creating and initializing it on
    /// first access.
    pub fn get<D: Definition>(
        &self,
        holder: &HolderRef,
        definition: &Rc<D>,
    ) -> FeatureResult<Rc<D::Feature>> {
        let name = definition.name();
        let stored = self.fetch_or_create(holder, definition.as_ref());

        let feature = Rc::clone(&stored)
            .into_any_rc()
            .downcast::<D::Feature>()
            .map_err(|_| {
                let stored_ref: &dyn Feature = &*stored;
                FeatureError::identity_mismatch(
                    name,
                    type_name::<D::Feature>(),
                    stored_ref.any_type_name(),
                )
            })?;

        if let Some(init) = stored.as_initializable() {
            if !init.is_initialized() {
                init.initialize(Rc::clone(definition) as Rc<dyn Any>)?;
                tracing::debug!(feature = name, holder = %holder.id(), "initialized feature");
            }
        }

        self.refresh(name, stored.as_ref());
        Ok(feature)
    }

    fn fetch_or_create<D: Definition>(
        &self,
        holder: &HolderRef,
        definition: &D,
    ) -> Rc<dyn Feature> {
        let mut features = self.features.borrow_mut();
        if let Some(existing) = features.get(definition.name()) {
            return Rc::clone(existing);
        }

        let created: Rc<dyn Feature> = Rc::new(definition.create(holder));
        features.insert(definition.name().to_string(), Rc::clone(&created));
        tracing::debug!(feature = definition.name(), holder = %holder.id(), "created feature");
        created
    }

    /// Look up an existing feature by name without creating it.
    pub fn lookup(&self, name: &str) -> Option<Rc<dyn Feature>> {
        let feature = self.features.borrow().get(name).cloned()?;
        self.refresh(name, feature.as_ref());
        Some(feature)
    }

    /// Re-read the hidden state of a stored feature.
    pub fn touch(&self, name: &str) {
        let feature = self.features.borrow().get(name).cloned();
        if let Some(feature) = feature {
            self.refresh(name, feature.as_ref());
        }
    }

    fn refresh(&self, name: &str, feature: &dyn Feature) {
        let hidden = feature.as_hideable().is_some_and(|h| h.is_hidden());
        self.visibility.borrow_mut().update(name, hidden);
    }

    /// All features, visible and hidden, ordered by name.
    pub fn iter(&self) -> Vec<Rc<dyn Feature>> {
        self.features.borrow().values().cloned().collect()
    }

    /// Names of the currently visible features, ordered by name.
    pub fn visible_names(&self) -> Vec<String> {
        self.visibility.borrow().iter().map(str::to_string).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.borrow().is_empty()
    }

    /// Compare the visible features of two registries.
    pub fn visible_eq(&self, other: &FeatureRegistry) -> bool {
        let ours = self.visibility.borrow();
        let theirs = other.visibility.borrow();
        if *ours != *theirs {
            return false;
        }

        let our_features = self.features.borrow();
        let their_features = other.features.borrow();
        let eq = ours.iter().all(|name| {
            let a = our_features.get(name).and_then(|f| f.state());
            let b = their_features.get(name).and_then(|f| f.state());
            a == b
        });
        eq
    }

    /// Order-insensitive hash over the visible features.
    pub fn visible_hash(&self) -> u64 {
        let visibility = self.visibility.borrow();
        let features = self.features.borrow();
        visibility.iter().fold(0u64, |acc, name| {
            let mut hasher = DefaultHasher::new();
            name.hash(&mut hasher);
            features
                .get(name)
                .and_then(|f| f.state())
                .hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        })
    }
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.features.borrow().keys().collect::<Vec<_>>())
            .field("visible", &*self.visibility.borrow())
            .finish()
    }
}
