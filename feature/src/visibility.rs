//! Visibility index: the features that take part in entity equality.

use std::collections::BTreeSet;

/// Ordered set of the names of currently visible (non-hidden) features.
///
/// Updated incrementally on every registry access rather than rescanned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VisibilityIndex {
    visible: BTreeSet<String>,
}

impl VisibilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hidden state of a feature.
    pub fn update(&mut self, name: &str, hidden: bool) {
        if hidden {
            self.hide(name);
        } else {
            self.show(name);
        }
    }

    pub fn show(&mut self, name: &str) {
        if !self.visible.contains(name) {
            self.visible.insert(name.to_string());
        }
    }

    pub fn hide(&mut self, name: &str) {
        self.visible.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.visible.contains(name)
    }

    /// Visible feature names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
