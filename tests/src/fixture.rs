//! Test hierarchy.

use weave_core::TypeId;
use weave_dispatch::{Context, WeaveConfig};
use weave_registry::{HierarchyBuilder, RegistryResult};

/// `Base` with two unrelated children, `Child1` and `Child2`.
pub struct Family {
    pub ctx: Context,
    pub base: TypeId,
    pub child1: TypeId,
    pub child2: TypeId,
}

impl Family {
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(WeaveConfig::default())
    }

    pub fn with_config(config: WeaveConfig) -> RegistryResult<Self> {
        let mut builder = HierarchyBuilder::new();
        let base = builder.add_type("Base").done()?;
        let child1 = builder.add_type("Child1").extends("Base").done()?;
        let child2 = builder.add_type("Child2").extends("Base").done()?;
        let ctx = Context::with_config(builder.build()?, config);
        Ok(Self {
            ctx,
            base,
            child1,
            child2,
        })
    }
}
