//! Dispatch configuration

use weave_registry::{Priority, TieBreak};

/// Settings shared by every definition created from one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaveConfig {
    /// Priority used by `add_default_handler`
    pub default_priority: Priority,
    /// Ordering of handlers with equal priority
    pub tie_break: TieBreak,
    /// Emit a trace event for every handler hop
    pub trace_dispatch: bool,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::DEFAULT,
            tie_break: TieBreak::RegistrationOrder,
            trace_dispatch: false,
        }
    }
}

impl WeaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.default_priority = priority.into();
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}
