//! Invocation chain integration tests: priority order, short-circuiting,
//! tie-breaking and argument coercion.

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

mod priority_ordering {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_handler_result_wins_and_chain_stops() {
        let mut family = Family::with_config(WeaveConfig::new().with_trace_dispatch(true)).unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();

        // Registered out of order on purpose.
        op.add_handler("D", family.base, recorder.handler("D", Step::Return(Value::Int(4))), 1)
            .unwrap();
        let b = recorder.handler("B", Step::ContinueThenReturn(Value::Int(2)));
        op.add_handler("B", family.base, b, 3).unwrap();
        op.add_handler("A", family.base, recorder.handler("A", Step::Continue), 4)
            .unwrap();
        op.add_handler("C", family.base, recorder.handler("C", Step::Return(Value::Int(3))), 2)
            .unwrap();

        let entity = family.ctx.spawn("Base").unwrap();
        let result = entity.get(&op).unwrap().invoke(args!()).unwrap();

        assert_eq!(result, Value::Int(2));
        assert_eq!(recorder.calls(), vec!["A", "B", "C"]);
        assert_eq!(recorder.count("D"), 0);
    }

    #[test]
    fn test_fresh_chain_per_call() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        op.add_handler("outer", family.base, recorder.handler("outer", Step::Continue), 2)
            .unwrap();
        let inner = recorder.handler("inner", Step::Return(Value::Bool(true)));
        op.add_handler("inner", family.base, inner, 1).unwrap();

        let function = family.ctx.spawn("Child1").unwrap().get(&op).unwrap();
        for _ in 0..3 {
            assert_eq!(function.invoke(args!()).unwrap(), Value::Bool(true));
        }
        assert_eq!(recorder.count("outer"), 3);
        assert_eq!(recorder.count("inner"), 3);
    }

    #[test]
    fn test_exhausted_chain_yields_null() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        op.add_handler("only", family.base, recorder.handler("only", Step::Continue), 0)
            .unwrap();

        let function = family.ctx.spawn("Base").unwrap().get(&op).unwrap();
        assert_eq!(function.invoke(args!()).unwrap(), Value::Null);
        assert_eq!(recorder.calls(), vec!["only"]);
    }
}

mod tie_break {
    use super::*;
    use pretty_assertions::assert_eq;

    fn order_with(tie_break: TieBreak) -> Vec<String> {
        let mut family = Family::with_config(WeaveConfig::new().with_tie_break(tie_break)).unwrap();
        let op = family.ctx.function("op", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        for name in ["first", "second", "third"] {
            op.add_default_handler(name, family.base, recorder.handler(name, Step::Continue))
                .unwrap();
        }

        let function = family.ctx.spawn("Base").unwrap().get(&op).unwrap();
        function.invoke(args!()).unwrap();
        recorder.calls()
    }

    #[test]
    fn test_registration_order_by_default() {
        assert_eq!(
            order_with(TieBreak::RegistrationOrder),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_reverse_registration_order() {
        assert_eq!(
            order_with(TieBreak::ReverseRegistrationOrder),
            vec!["third", "second", "first"]
        );
    }
}

mod argument_coercion {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vararg_packing() {
        let mut family = Family::new().unwrap();
        let shape = ParamShape::variadic([ValueType::String], ValueType::Any);
        let op = family.ctx.function("pack", shape).unwrap();
        let recorder = Recorder::new();
        op.add_handler("outer", family.base, recorder.handler("outer", Step::Continue), 1)
            .unwrap();
        op.add_handler("seen", family.base, recorder.handler("seen", Step::Return(Value::Null)), 0)
            .unwrap();

        let function = family.ctx.spawn("Base").unwrap().get(&op).unwrap();
        function.invoke(args!["val1", 2i64, 3i64, 4i64]).unwrap();
        function
            .invoke(vec![Value::from("val1"), Value::from(vec![2i64, 3, 4])])
            .unwrap();

        let expected = vec![Value::from("val1"), Value::from(vec![2i64, 3, 4])];
        assert_eq!(recorder.args_of("outer"), vec![expected.clone(), expected.clone()]);
        assert_eq!(recorder.args_of("seen"), vec![expected.clone(), expected]);
    }

    #[test]
    fn test_shape_errors_fail_before_any_handler() {
        let mut family = Family::new().unwrap();
        let op = family
            .ctx
            .function("typed", ParamShape::fixed([ValueType::Int, ValueType::String]))
            .unwrap();
        let recorder = Recorder::new();
        op.add_handler("h", family.base, recorder.handler("h", Step::Return(Value::Null)), 0)
            .unwrap();
        let function = family.ctx.spawn("Base").unwrap().get(&op).unwrap();

        let err = function.invoke(args![1i64]).unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentCount { actual: 1, .. }));

        let err = function.invoke(args!["1", "x"]).unwrap_err();
        assert!(matches!(err, DispatchError::ArgumentType { index: 0, .. }));

        // Nulls satisfy any slot.
        function.invoke(vec![Value::Null, Value::Null]).unwrap();
        assert_eq!(recorder.count("h"), 1);
    }

    #[test]
    fn test_zero_parameter_operation_rejects_arguments() {
        let mut family = Family::new().unwrap();
        let op = family.ctx.function("nullary", ParamShape::none()).unwrap();
        let recorder = Recorder::new();
        op.add_handler("h", family.base, recorder.handler("h", Step::Return(Value::Null)), 0)
            .unwrap();

        let function = family.ctx.spawn("Base").unwrap().get(&op).unwrap();
        assert!(function.invoke(args![1i64]).unwrap_err().is_argument_error());
        assert!(recorder.calls().is_empty());
    }
}
