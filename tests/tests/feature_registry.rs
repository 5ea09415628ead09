//! Feature registry integration tests: lazy fetch, one-shot initialization
//! and visibility.

use pretty_assertions::assert_eq;
use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weave_feature::{
    downcast_definition, Definition, FeatureError, FeatureResult, HolderRef, Initializable,
};
use weave_tests::prelude::*;

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// A feature that counts how often it is initialized.
struct Tally {
    holder: HolderRef,
    initialized: Cell<usize>,
}

impl Feature for Tally {
    fn name(&self) -> &str {
        "tally"
    }

    fn holder(&self) -> &HolderRef {
        &self.holder
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Initializable for Tally {
    fn is_initialized(&self) -> bool {
        self.initialized.get() > 0
    }

    fn initialize(&self, definition: Rc<dyn Any>) -> FeatureResult<()> {
        downcast_definition::<TallyDefinition>("tally", definition)?;
        self.initialized.set(self.initialized.get() + 1);
        Ok(())
    }
}

struct TallyDefinition;

impl Definition for TallyDefinition {
    type Feature = Tally;

    fn name(&self) -> &str {
        "tally"
    }

    fn create(&self, holder: &HolderRef) -> Tally {
        Tally {
            holder: holder.clone(),
            initialized: Cell::new(0),
        }
    }
}

mod idempotent_fetch {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_instance_and_single_initialize() {
        let family = Family::new().unwrap();
        let entity = family.ctx.spawn("Base").unwrap();
        let definition = Rc::new(TallyDefinition);

        let first = entity.get(&definition).unwrap();
        for _ in 0..5 {
            let again = entity.get(&definition).unwrap();
            assert!(Rc::ptr_eq(&first, &again));
        }
        assert_eq!(first.initialized.get(), 1);
        assert_eq!(entity.features().len(), 1);
    }

    #[test]
    fn test_each_entity_gets_its_own_feature() {
        let mut family = Family::new().unwrap();
        let score = family
            .ctx
            .property("score", ValueType::Int)
            .initial(0i64)
            .done()
            .unwrap();
        let a = family.ctx.spawn("Child1").unwrap();
        let b = family.ctx.spawn("Child2").unwrap();

        a.get(&score).unwrap().set(10i64).unwrap();
        assert_eq!(a.get(&score).unwrap().get().unwrap(), Value::Int(10));
        assert_eq!(b.get(&score).unwrap().get().unwrap(), Value::Int(0));
    }

    #[test]
    fn test_name_clash_with_other_feature_type_fails() {
        let mut family = Family::new().unwrap();
        family.ctx.function("tally", ParamShape::none()).unwrap();
        let entity = family.ctx.spawn("Base").unwrap();

        entity.get(&Rc::new(TallyDefinition)).unwrap();
        let entry = family.ctx.definition("tally").unwrap();
        let err = entry.fetch(&entity).err().unwrap();
        assert!(matches!(
            err,
            DispatchError::Feature(FeatureError::IdentityMismatch { .. })
        ));
    }
}

mod visibility {
    use super::*;
    use pretty_assertions::assert_eq;

    fn colored(family: &mut Family) -> (Rc<Entity>, Rc<Entity>) {
        let color = family
            .ctx
            .property("color", ValueType::String)
            .initial("red")
            .done()
            .unwrap();
        let nickname = family.ctx.property("nickname", ValueType::String).done().unwrap();

        let a = family.ctx.spawn("Base").unwrap();
        let b = family.ctx.spawn("Base").unwrap();
        a.get(&color).unwrap();
        b.get(&color).unwrap();
        a.get(&nickname).unwrap().set("ace").unwrap();
        b.get(&nickname).unwrap().set("bee").unwrap();
        (a, b)
    }

    #[test]
    fn test_hiding_affects_equality_only() {
        let mut family = Family::new().unwrap();
        let (a, b) = colored(&mut family);
        let nickname = match family.ctx.definition("nickname").unwrap() {
            weave_dispatch::DefinitionEntry::Property(def) => Rc::clone(def),
            other => panic!("unexpected definition {:?}", other),
        };
        assert_ne!(*a, *b);

        a.get(&nickname).unwrap().set_hidden(true);
        b.get(&nickname).unwrap().set_hidden(true);
        assert_eq!(*a, *b);

        // Storage and full iteration are untouched.
        assert_eq!(a.get(&nickname).unwrap().get().unwrap(), Value::from("ace"));
        assert_eq!(a.features().len(), 2);
        assert_eq!(
            a.features()
                .iter()
                .iter()
                .map(|f| f.name().to_string())
                .collect::<Vec<_>>(),
            vec!["color", "nickname"]
        );
        assert_eq!(a.features().visible_names(), vec!["color"]);

        a.get(&nickname).unwrap().set_hidden(false);
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_equal_entities_hash_alike() {
        use std::collections::HashSet;

        let mut family = Family::new().unwrap();
        let (a, b) = colored(&mut family);
        for entity in [&a, &b] {
            let entry = family.ctx.definition("nickname").unwrap();
            let feature = entry.fetch(entity).unwrap();
            let property =
                weave_feature::downcast_feature::<weave_dispatch::Property>(&feature).unwrap();
            property.set_hidden(true);
        }

        let set: HashSet<&Entity> = [a.as_ref(), b.as_ref()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_signed_zero_entities_hash_alike() {
        use std::collections::HashSet;

        let mut family = Family::new().unwrap();
        let weight = family.ctx.property("weight", ValueType::Float).done().unwrap();
        let a = family.ctx.spawn("Base").unwrap();
        let b = family.ctx.spawn("Base").unwrap();
        a.get(&weight).unwrap().set(0.0).unwrap();
        b.get(&weight).unwrap().set(-0.0).unwrap();

        assert_eq!(*a, *b);
        let set: HashSet<&Entity> = [a.as_ref(), b.as_ref()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_functions_never_affect_equality() {
        let mut family = Family::new().unwrap();
        let greet = family.ctx.function("greet", ParamShape::none()).unwrap();
        let a = family.ctx.spawn("Base").unwrap();
        let b = family.ctx.spawn("Child1").unwrap();

        a.get(&greet).unwrap();
        assert_eq!(*a, *b);
        assert!(a.features().contains("greet"));
    }
}
