//! Handler priorities and the ordering of equal priorities.

use std::cmp::Ordering;
use std::fmt;

/// Execution priority of a handler (higher = runs first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    /// Priority used when none is given.
    pub const DEFAULT: Priority = Priority(0);
    /// Priority of the built-in storage handlers; always last in a chain.
    /// Dispatch refuses user handlers at this priority.
    pub const STORAGE: Priority = Priority(i32::MIN);
    pub const HIGHEST: Priority = Priority(i32::MAX);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How handlers with equal priority are ordered within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// The handler registered first runs first.
    #[default]
    RegistrationOrder,
    /// The handler registered last runs first.
    ReverseRegistrationOrder,
}

impl TieBreak {
    /// Compare two registration sequence numbers of equal-priority handlers.
    pub fn compare(&self, a_seq: u64, b_seq: u64) -> Ordering {
        match self {
            TieBreak::RegistrationOrder => a_seq.cmp(&b_seq),
            TieBreak::ReverseRegistrationOrder => b_seq.cmp(&a_seq),
        }
    }
}
