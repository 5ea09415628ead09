//! Weave Core Types
//!
//! This crate provides the foundational types used throughout Weave:
//! - Identity types (EntityId, TypeId)
//! - Dynamic values passed to and returned from handlers (Value)
//! - Declared parameter slot types (ValueType)

mod id;
mod value;

pub use id::*;
pub use value::*;
