//! Declared parameter shapes and argument coercion.

use crate::{DispatchError, DispatchResult};
use std::fmt;
use weave_core::{Value, ValueType};

/// Ordered parameter slots of an operation; the last slot may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParamShape {
    params: Vec<ValueType>,
    variadic: bool,
}

impl ParamShape {
    /// No parameters.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exactly these parameters.
    pub fn fixed(params: impl Into<Vec<ValueType>>) -> Self {
        Self {
            params: params.into(),
            variadic: false,
        }
    }

    /// Fixed parameters followed by any number of `element` values, handed to
    /// handlers packed into one `List`.
    pub fn variadic(fixed: impl Into<Vec<ValueType>>, element: ValueType) -> Self {
        let mut params = fixed.into();
        params.push(element);
        Self {
            params,
            variadic: true,
        }
    }

    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Validate `args` and pack trailing repeatable values.
    ///
    /// Handlers of a variadic operation always see `(fixed..., List)`.
    pub fn coerce(&self, mut args: Vec<Value>) -> DispatchResult<Vec<Value>> {
        if self.params.is_empty() {
            if !args.is_empty() {
                return Err(DispatchError::argument_count("0", args.len()));
            }
            return Ok(args);
        }

        if !self.variadic {
            if args.len() != self.params.len() {
                return Err(DispatchError::argument_count(
                    self.params.len().to_string(),
                    args.len(),
                ));
            }
            check_slots(&self.params, &args)?;
            return Ok(args);
        }

        let fixed = self.params.len() - 1;
        let element = self.params[fixed];
        if args.len() < fixed {
            return Err(DispatchError::argument_count(
                format!("at least {}", fixed),
                args.len(),
            ));
        }
        check_slots(&self.params[..fixed], &args[..fixed])?;

        if self.is_prepacked(&args, element) {
            return Ok(args);
        }

        let trailing = args.split_off(fixed);
        for (offset, value) in trailing.iter().enumerate() {
            if !element.accepts(value) {
                return Err(DispatchError::argument_type(
                    fixed + offset,
                    element,
                    value.type_name(),
                ));
            }
        }
        args.push(Value::List(trailing));
        Ok(args)
    }

    /// The caller already supplied the trailing values as one list.
    fn is_prepacked(&self, args: &[Value], element: ValueType) -> bool {
        args.len() == self.params.len()
            && matches!(
                args.last(),
                Some(Value::List(items)) if items.iter().all(|v| element.accepts(v))
            )
    }
}

fn check_slots(slots: &[ValueType], args: &[Value]) -> DispatchResult<()> {
    for (index, (slot, value)) in slots.iter().zip(args).enumerate() {
        if !slot.accepts(value) {
            return Err(DispatchError::argument_type(index, *slot, value.type_name()));
        }
    }
    Ok(())
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        if self.variadic {
            write!(f, "...")?;
        }
        write!(f, ")")
    }
}
