//! Handlers and the invocation chain that runs them.
//!
//! A chain is an immutable, priority-ordered slice of handlers plus a
//! cursor. Each handler receives the chain and decides whether to continue
//! (`chain.invoke(args)`) or to cut the chain short by returning. The value
//! returned to the caller is whatever the first handler returns.

use crate::{DispatchError, DispatchResult, ParamShape, Storage};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use weave_core::Value;
use weave_feature::{Entity, HolderRef};
use weave_registry::Registered;

/// A unit of logic in an operation's dispatch chain.
pub trait Executor {
    fn execute(&self, chain: &mut InvocationChain<'_>, args: Vec<Value>) -> DispatchResult<Value>;
}

impl<F> Executor for F
where
    F: Fn(&mut InvocationChain<'_>, Vec<Value>) -> DispatchResult<Value>,
{
    fn execute(&self, chain: &mut InvocationChain<'_>, args: Vec<Value>) -> DispatchResult<Value> {
        self(chain, args)
    }
}

/// Shared handler as stored in an executor registry.
pub type Handler = Rc<dyn Executor>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut InvocationChain<'_>, Vec<Value>) -> DispatchResult<Value> + 'static,
{
    Rc::new(f)
}

/// One top-level invocation of an operation.
pub struct InvocationChain<'a> {
    feature: &'a str,
    operation: &'a str,
    handlers: &'a [Registered<Handler>],
    cursor: usize,
    shape: &'a ParamShape,
    holder: &'a HolderRef,
    storage: Option<&'a RefCell<Box<dyn Storage>>>,
    trace: bool,
}

impl<'a> InvocationChain<'a> {
    pub(crate) fn new(
        feature: &'a str,
        operation: &'a str,
        handlers: &'a [Registered<Handler>],
        shape: &'a ParamShape,
        holder: &'a HolderRef,
        storage: Option<&'a RefCell<Box<dyn Storage>>>,
        trace: bool,
    ) -> Self {
        Self {
            feature,
            operation,
            handlers,
            cursor: 0,
            shape,
            holder,
            storage,
            trace,
        }
    }

    /// Run the next handler.
    ///
    /// Returns `Null` once the chain is exhausted. Arguments are coerced
    /// against the operation's shape before the handler sees them.
    pub fn invoke(&mut self, args: Vec<Value>) -> DispatchResult<Value> {
        let handlers = self.handlers;
        let Some(entry) = handlers.get(self.cursor) else {
            return Ok(Value::Null);
        };

        let args = self.shape.coerce(args)?;
        self.cursor += 1;

        if self.trace {
            tracing::trace!(
                feature = self.feature,
                operation = self.operation,
                handler = %entry.name,
                priority = %entry.priority,
                position = self.cursor,
                holder = %self.holder.id(),
                "dispatching"
            );
        }

        entry.handler.execute(self, args)
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.handlers.len()
    }

    /// Number of handlers not yet run.
    pub fn remaining(&self) -> usize {
        self.handlers.len() - self.cursor
    }

    /// Name of the feature being invoked.
    pub fn feature_name(&self) -> &str {
        self.feature
    }

    /// Sub-operation being invoked (`invoke`, `getter`, ...).
    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn holder(&self) -> &HolderRef {
        self.holder
    }

    /// The entity the feature belongs to.
    pub fn entity(&self) -> DispatchResult<Rc<Entity>> {
        self.holder
            .upgrade()
            .ok_or_else(|| DispatchError::HolderDropped(self.feature.to_string()))
    }

    /// The invoked feature's storage, for storage-backed operations.
    pub fn storage(&self) -> DispatchResult<&'a RefCell<Box<dyn Storage>>> {
        self.storage.ok_or_else(|| {
            let handler = self
                .cursor
                .checked_sub(1)
                .and_then(|index| self.handlers.get(index))
                .map(|entry| entry.name.clone())
                .unwrap_or_default();
            DispatchError::missing_storage(self.feature, handler)
        })
    }
}

impl fmt::Debug for InvocationChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationChain")
            .field("feature", &self.feature)
            .field("operation", &self.operation)
            .field("cursor", &self.cursor)
            .field("handlers", &self.handlers)
            .finish()
    }
}
