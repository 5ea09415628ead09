//! Shared fixtures for the Weave integration tests.
//!
//! - [`Family`]: a context over the `Base` / `Child1` / `Child2` hierarchy
//! - [`Recorder`]: handlers that log their invocations and follow a scripted
//!   [`Step`]

mod fixture;

pub use fixture::Family;
pub use recorder::{Recorder, Step};

pub mod prelude {
    pub use crate::{Family, Recorder, Step};
    pub use weave_core::{args, EntityId, TypeId, Value, ValueType};
    pub use weave_dispatch::{
        handler, Context, DispatchError, ParamShape, Priority, WeaveConfig, ADDER, GETTER,
        INVOKE, REMOVER, SETTER,
    };
    pub use weave_feature::{Entity, Feature};
    pub use weave_registry::TieBreak;
}
