use pretty_assertions::assert_eq;

use golite_ir::SharedInterner;

use super::*;
use crate::builtins::Builtin;
use crate::print_handler::silent_handler;

fn config() -> VmConfig {
    VmConfig::new(SharedInterner::new()).with_print(silent_handler())
}

fn message<T: fmt::Debug>(result: EvalResult<T>) -> String {
    match result {
        Ok(v) => panic!("expected an error, got {v:?}"),
        Err(e) => e.to_string(),
    }
}

#[derive(Debug, Default)]
struct Counter {
    n: i64,
}

fn counter_type() -> HostType<Counter> {
    HostType::<Counter>::builder("Counter")
        .field_mut(
            "N",
            |c| Value::Int(c.n),
            |c, v| {
                c.n = v.as_int().ok_or_else(|| EvalError::host("N is an int"))?;
                Ok(())
            },
        )
        .field("Double", |c| Value::Int(c.n * 2))
        .method("Add", |c, args| {
            let by = args.first().and_then(Value::as_int).unwrap_or(1);
            c.n += by;
            Ok(Value::Int(c.n))
        })
        .constructor(Counter::default)
        .display(|c| format!("Counter({})", c.n))
        .build()
}

#[test]
fn test_typed_native_functions() {
    let config = config();
    let add = (|a: i64, b: i64| a + b).into_native("add");
    assert_eq!(add.name(), "add");
    assert!(matches!(add.call(&[Value::Int(2), Value::Int(3)], &config), Ok(Value::Int(5))));
    assert_eq!(
        message(add.call(&[Value::Int(2)], &config)),
        "wrong argument count in call to add: have 1, want 2"
    );
    assert_eq!(
        message(add.call(&[Value::from("x"), Value::Int(3)], &config)),
        "cannot convert string to i64"
    );

    let greet = (|name: String| format!("hello {name}")).into_native("greet");
    let greeting = greet.call(&[Value::from("gopher")], &config);
    assert_eq!(greeting.map(|v| v.to_string()).ok().as_deref(), Some("hello gopher"));

    let split = (|| (1_i64, "two")).into_native("split");
    let pair = split.call(&[], &config);
    assert!(matches!(&pair, Ok(Value::List(l)) if !l.borrow().mutable));
}

#[test]
fn test_untyped_native_functions_report_their_errors() {
    let fail = NativeFunc::new("fail", |_| Err(EvalError::host("nope")));
    assert_eq!(message(fail.call(&[], &config())), "nope");
    assert_eq!(format!("{fail:?}"), "NativeFunc(fail)");
}

#[test]
fn test_host_values_convert_into_script_values() {
    assert!(matches!(().into_value(), Value::Nil));
    assert!(matches!(7_i32.into_value(), Value::Int(7)));
    assert!(matches!(None::<i64>.into_value(), Value::Nil));
    assert_eq!(vec![1_i64, 2, 3].into_value().to_string(), "[1 2 3]");
    assert_eq!((1_i64, "a", true).into_value().to_string(), "[1 a true]");
}

#[test]
fn test_script_values_convert_into_host_values() {
    let config = config();
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(Vec::<i64>::from_value(list, &config).ok(), Some(vec![1, 2]));
    assert_eq!(Vec::<i64>::from_value(Value::Nil, &config).ok(), Some(vec![]));

    let nested = Value::list(vec![Value::list(vec![Value::from("a")])]);
    assert_eq!(
        Vec::<Vec<String>>::from_value(nested, &config).ok(),
        Some(vec![vec!["a".to_owned()]])
    );

    let pair = Value::tuple(vec![Value::Int(1), Value::from("x")]);
    assert_eq!(
        <(i64, String)>::from_value(pair, &config).ok(),
        Some((1, "x".to_owned()))
    );
    assert_eq!(
        message(<(i64, i64)>::from_value(Value::Int(1), &config)),
        "cannot convert int to 2 results"
    );

    assert_eq!(Option::<String>::from_value(Value::Nil, &config).ok(), Some(None));
    assert_eq!(u64::from_value(Value::Int(4), &config).ok(), Some(4));
    assert_eq!(message(u64::from_value(Value::Int(-4), &config)), "cannot convert int to u64");
    assert_eq!(f64::from_value(Value::Int(2), &config).ok(), Some(2.0));
}

#[test]
fn test_host_type_fields_and_methods() {
    let counter = counter_type();
    let value = counter.wrap(Counter { n: 2 });
    let Value::External(ext) = &value else {
        panic!("expected a host value");
    };
    assert_eq!(ext.type_name(), "Counter");
    assert!(matches!(ext.get_field("N"), Ok(Value::Int(2))));
    assert!(matches!(ext.get_field("Double"), Ok(Value::Int(4))));
    assert!(ext.set_field("N", Value::Int(10)).is_ok());
    assert!(matches!(ext.call_method("Add", &[Value::Int(5)]), Ok(Value::Int(15))));
    assert_eq!(value.to_string(), "Counter(15)");
    assert_eq!(ext.with(|c: &Counter| c.n), Some(15));

    assert_eq!(
        message(ext.set_field("Double", Value::Int(1))),
        "cannot assign to read-only field Counter.Double"
    );
    assert_eq!(message(ext.get_field("Missing")), "Counter has no field or method Missing");
    assert_eq!(message(ext.call_method("Reset", &[])), "Counter has no field or method Reset");
}

#[test]
fn test_host_type_descriptor() {
    let interner = SharedInterner::new();
    let counter = counter_type();
    let desc = counter.descriptor();
    assert_eq!(desc.to_string(), "Counter");

    let zero = desc.zero();
    assert_eq!(zero.to_string(), "Counter(0)");
    assert!(desc.matches(&zero, &interner));
    assert!(!desc.matches(&Value::Int(0), &interner));

    let copy = zero.clone();
    if let Value::External(ext) = &copy {
        assert!(ext.call_method("Add", &[]).is_ok());
    }
    // Copies share the host value.
    assert_eq!(zero.to_string(), "Counter(1)");

    let ext = External::from_value(zero, &config());
    assert!(ext.is_ok());
    assert_eq!(
        message(External::from_value(Value::Int(1), &config())),
        "cannot convert int to host value"
    );
}

#[test]
fn test_script_fn_wraps_callables() {
    let config = config();
    let len = ScriptFn::new(Value::Builtin(Builtin::Len), config.clone());
    assert_eq!(len.call::<i64>(("abc",)).ok(), Some(3));
    assert!(matches!(len.value(), Value::Builtin(Builtin::Len)));

    let native = (|a: i64| a * 10).into_native("scale").into_value();
    let scale = ScriptFn::from_value(native, &config);
    assert_eq!(scale.and_then(|f| f.call::<i64>((4_i64,))).ok(), Some(40));

    assert_eq!(
        message(ScriptFn::from_value(Value::Int(1), &config)),
        "cannot convert int to func"
    );
}
