use pretty_assertions::assert_eq;

use golite::{EvalError, HostType, InterpreterBuilder, Value};

use crate::common::{build_with, failure};

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
fn test_globals_and_natives() {
    let builder = InterpreterBuilder::new()
        .source("func main() {\n\tprintln(greet(name), sum(limits), limit+1)\n}")
        .global("name", "gopher")
        .global("limit", 41_i64)
        .global("limits", vec![1_i64, 2, 3])
        .native("greet", |who: String| format!("hello {who}"))
        .native("sum", |xs: Vec<i64>| xs.iter().sum::<i64>());
    let (mut interp, out) = build_with(builder);
    interp.run().unwrap();
    assert_eq!(out.get_output(), "hello gopher 6 42\n");
}

#[test]
fn test_native_argument_errors_are_recoverable() {
    let builder = InterpreterBuilder::new()
        .source(
            r#"func main() {
	defer func() {
		println("recovered:", recover())
	}()
	greet(1)
}"#,
        )
        .native("greet", |who: String| format!("hello {who}"));
    let (mut interp, out) = build_with(builder);
    interp.run().unwrap();
    assert_eq!(out.get_output(), "recovered: cannot convert int to String\n");
}

#[test]
fn test_host_types_from_scripts() {
    let counters = counter_type();
    let shared = counters.wrap(Counter { n: 10 });
    let builder = InterpreterBuilder::new()
        .source(
            r#"func main() {
	c := Counter{N: 3}
	c.Add(2)
	c.N += 1
	println(c, c.N, c.Double)
	shared.Add(5)
	var x any = shared
	_, ok := x.(Counter)
	_, bad := x.(int)
	println(shared, ok, bad)
}"#,
        )
        .host_type(&counters)
        .global("shared", shared.clone());
    let (mut interp, out) = build_with(builder);
    interp.run().unwrap();
    assert_eq!(out.get_output(), "Counter(6) 6 12\nCounter(15) true false\n");

    // Scripts share the host's value.
    let Value::External(ext) = shared else {
        panic!("expected a host value");
    };
    assert_eq!(ext.with(|c: &Counter| c.n), Some(15));
}

#[test]
fn test_read_only_host_fields() {
    let err = failure(
        InterpreterBuilder::new()
            .source("func main() {\n\tc := Counter{}\n\tc.Double = 1\n}")
            .host_type(&counter_type()),
    );
    assert_eq!(err.to_string(), "cannot assign to read-only field Counter.Double");

    let err = failure(
        InterpreterBuilder::new()
            .source("func main() {\n\tc := Counter{}\n\tc.Reset()\n}")
            .host_type(&counter_type()),
    );
    assert_eq!(err.to_string(), "Counter has no field or method Reset");
}

#[test]
fn test_globals_may_not_shadow_builtins() {
    let err = failure(
        InterpreterBuilder::new()
            .source("func main() {}")
            .native("len", |s: String| s),
    );
    assert_eq!(err.to_string(), "global name collides with builtin: len");

    let err = failure(InterpreterBuilder::new().global("true", 1_i64));
    assert_eq!(err.to_string(), "global name collides with builtin: true");
}
