//! Variant resolution integration tests: handlers registered per type,
//! most specific variant wins, registration changes are seen immediately.

use pretty_assertions::assert_eq;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weave_tests::prelude::*;

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

mod specificity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subtype_handler_only_runs_for_that_subtype() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        op.add_handler("special", family.child1, recorder.handler("special", Step::Continue), 1)
            .unwrap();

        for type_name in ["Base", "Child1", "Child2"] {
            let entity = family.ctx.spawn(type_name).unwrap();
            entity.get(&op).unwrap().invoke(args!()).unwrap();
        }

        assert_eq!(recorder.calls(), vec!["special"]);
    }

    #[test]
    fn test_exact_type_wins_over_ancestor() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("describe", ParamShape::none()).unwrap();
        let answer = |text: &'static str| handler(move |_c, _a| Ok(Value::from(text)));
        op.add_default_handler("describe", family.base, answer("base"))
            .unwrap();
        op.add_default_handler("describe", family.child1, answer("child1"))
            .unwrap();

        let describe = |type_name: &str| {
            let entity = family.ctx.spawn(type_name).unwrap();
            let result = entity.get(&op).unwrap().invoke(args!()).unwrap();
            result
        };

        assert_eq!(describe("Child1"), Value::from("child1"));
        assert_eq!(describe("Child2"), Value::from("base"));
        assert_eq!(describe("Base"), Value::from("base"));
    }

    #[test]
    fn test_handlers_of_different_names_combine() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        op.add_handler("audit", family.base, recorder.handler("audit", Step::Continue), 5)
            .unwrap();
        let base_body = recorder.handler("base-body", Step::Return(Value::Int(0)));
        let child2_body = recorder.handler("child2-body", Step::Return(Value::Int(2)));
        op.add_handler("body", family.base, base_body, 0).unwrap();
        op.add_handler("body", family.child2, child2_body, 0).unwrap();

        let entity = family.ctx.spawn("Child2").unwrap();
        assert_eq!(entity.get(&op).unwrap().invoke(args!()).unwrap(), Value::Int(2));
        assert_eq!(recorder.calls(), vec!["audit", "child2-body"]);
    }

    #[test]
    fn test_property_interceptor_per_variant() {
        let mut family = Family::new().unwrap();
        let title = family
            .ctx
            .property("title", ValueType::String)
            .initial("untitled")
            .done()
            .unwrap();
        title
            .add_default_handler(
                GETTER,
                "decorate",
                family.child2,
                handler(|chain, args| {
                    let stored = chain.invoke(args)?;
                    Ok(Value::from(format!("*{}*", stored.as_str().unwrap_or_default())))
                }),
            )
            .unwrap();

        let plain = family.ctx.spawn("Child1").unwrap();
        let fancy = family.ctx.spawn("Child2").unwrap();
        assert_eq!(plain.get(&title).unwrap().get().unwrap(), Value::from("untitled"));
        assert_eq!(fancy.get(&title).unwrap().get().unwrap(), Value::from("*untitled*"));
    }
}

mod cache_invalidation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registration_changes_resolution() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        op.add_default_handler("h", family.base, handler(|_c, _a| Ok(Value::from("base"))))
            .unwrap();

        let function = family.ctx.spawn("Child1").unwrap().get(&op).unwrap();
        assert_eq!(function.invoke(args!()).unwrap(), Value::from("base"));
        assert!(op.operations().executors().is_cached(family.child1));

        op.add_default_handler("h", family.child1, handler(|_c, _a| Ok(Value::from("child1"))))
            .unwrap();
        assert!(!op.operations().executors().is_cached(family.child1));
        assert_eq!(function.invoke(args!()).unwrap(), Value::from("child1"));

        assert!(op.remove_handler("h", family.child1));
        assert_eq!(function.invoke(args!()).unwrap(), Value::from("base"));
    }

    #[test]
    fn test_resolution_shared_per_type() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        op.add_default_handler("h", family.base, handler(|_c, _a| Ok(Value::Null)))
            .unwrap();

        let first = op.operations().resolve_for(family.child2);
        let second = op.operations().resolve_for(family.child2);
        assert!(std::rc::Rc::ptr_eq(&first, &second));
        assert_eq!(first.handler_names(INVOKE), vec!["h"]);
    }

    #[test]
    fn test_collection_sub_operations_resolve_independently() {
        let mut family = Family::new().unwrap();
        let tags = family
            .ctx
            .collection_property("tags", ValueType::String)
            .done()
            .unwrap();
        let recorder = Recorder::new();
        let on_add = recorder.handler("add", Step::Continue);
        let on_remove = recorder.handler("remove", Step::Continue);
        tags.add_default_handler(ADDER, "log-add", family.child1, on_add)
            .unwrap();
        tags.add_default_handler(REMOVER, "log-remove", family.base, on_remove)
            .unwrap();

        let c1 = family.ctx.spawn("Child1").unwrap().get(&tags).unwrap();
        let c2 = family.ctx.spawn("Child2").unwrap().get(&tags).unwrap();
        c1.add("x").unwrap();
        c2.add("y").unwrap();
        c1.clear().unwrap();
        c2.clear().unwrap();

        assert_eq!(recorder.calls(), vec!["add", "remove", "remove"]);
        assert!(c1.is_empty().unwrap());
        assert!(c2.is_empty().unwrap());
    }
}
