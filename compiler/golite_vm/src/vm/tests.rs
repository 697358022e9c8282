use std::collections::BTreeMap;
use std::fmt::Write as _;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use golite_compile::Mode;
use golite_ir::SharedInterner;

use super::*;
use crate::builtins::Builtin;
use crate::errors::EvalErrorKind;
use crate::print_handler::buffer_handler;
use crate::prelude_env;

fn config() -> VmConfig {
    VmConfig::new(SharedInterner::new()).with_print(buffer_handler())
}

fn load(source: &str, mode: Mode, config: &VmConfig) -> Vm {
    let file = match golite_parse::parse_source(source, &config.interner) {
        Ok(file) => file,
        Err(e) => panic!("parse failed: {e}"),
    };
    let entry = match golite_compile::compile(&file, &config.interner, mode) {
        Ok(entry) => entry,
        Err(e) => panic!("compile failed: {e}"),
    };
    Vm::new(entry, prelude_env(&config.interner), config.clone())
}

/// Run a program and return everything it printed.
fn output(source: &str) -> String {
    let config = config();
    let mut vm = load(source, Mode::Program, &config);
    if let Err(e) = vm.run() {
        panic!("run failed: {e}\n{}", config.print.get_output());
    }
    config.print.get_output()
}

fn run_err(source: &str) -> EvalError {
    let config = config();
    let mut vm = load(source, Mode::Program, &config);
    match vm.run() {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    }
}

#[test]
fn test_fib() {
    let out = output(
        "func fib(n int) int {
	if n < 2 {
		return n
	}
	return fib(n-1) + fib(n-2)
}
func main() {
	println(fib(5), fib(10))
}",
    );
    assert_eq!(out, "5 55\n");
}

#[test]
fn test_else_branch_and_short_circuit() {
    let out = output(
        "func side(tag string, v bool) bool {
	print(tag)
	return v
}
func main() {
	if side(\"a\", false) && side(\"b\", true) {
		println(\"yes\")
	} else {
		println(\"no\")
	}
	if side(\"c\", true) || side(\"d\", true) {
		println(\"yes\")
	}
}",
    );
    assert_eq!(out, "ano\ncyes\n");
}

#[test]
fn test_closures_share_cells() {
    let out = output(
        "func counter() (func() int, func() int) {
	n := 0
	inc := func() int {
		n++
		return n
	}
	get := func() int {
		return n
	}
	return inc, get
}
func main() {
	inc, get := counter()
	inc()
	inc()
	println(get())
}",
    );
    assert_eq!(out, "2\n");
}

#[test]
fn test_defers_run_lifo_and_recover_sets_named_result() {
    let out = output(
        "func safe() (result int) {
	defer func() {
		if r := recover(); r != nil {
			println(\"recovered:\", r)
			result = -1
		}
	}()
	defer println(\"second\")
	panic(\"boom\")
}
func main() {
	println(safe())
}",
    );
    assert_eq!(out, "second\nrecovered: boom\n-1\n");
}

#[test]
fn test_runtime_error_is_recoverable() {
    let out = output(
        "func div(a, b int) (q int, err string) {
	defer func() {
		if r := recover(); r != nil {
			err = r.(string)
		}
	}()
	q = a / b
	return
}
func main() {
	q, err := div(7, 2)
	println(q, err == \"\")
	q, err = div(1, 0)
	println(q, err)
}",
    );
    assert_eq!(out, "3 true\n0 integer divide by zero\n");
}

#[test]
fn test_recover_outside_unwinding_is_nil() {
    let out = output("func main() {\n\tprintln(recover())\n}");
    assert_eq!(out, "<nil>\n");
}

#[test]
fn test_recover_in_nested_call_keeps_outer_panic() {
    let source = r#"func safe() {
	defer func() {
		println("inner recovered:", recover())
	}()
	panic("inner")
}

func f() {
	defer func() {
		safe()
	}()
	panic("outer")
}

func main() {
	f()
	println("reached")
}"#;
    let config = config();
    let mut vm = load(source, Mode::Program, &config);
    let err = match vm.run() {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    };
    assert_eq!(err.message, "panic: outer");
    assert_eq!(config.print.get_output(), "inner recovered: inner\n");
}

#[test]
fn test_panic_escaping_a_deferred_call_replaces_the_first() {
    let out = output(
        r#"func f() {
	defer func() {
		panic("second")
	}()
	panic("first")
}

func main() {
	defer func() {
		println("got", recover())
	}()
	f()
}"#,
    );
    assert_eq!(out, "got second\n");
}

#[test]
fn test_unrecovered_panic_has_backtrace() {
    let err = run_err("func explode() {\n\tpanic(\"boom\")\n}\nfunc main() {\n\texplode()\n}");
    assert_eq!(err.message, "panic: boom");
    assert!(matches!(err.kind, EvalErrorKind::Panic { .. }));
    let Some(backtrace) = err.backtrace else {
        panic!("expected a backtrace");
    };
    let names: Vec<&str> = backtrace.frames().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names[..2], ["explode", "main"]);
}

#[test]
fn test_runtime_error_keeps_its_kind() {
    let err = run_err("func main() {\n\tlist := []int{1, 2, 3}\n\tprintln(list[5])\n}");
    assert_eq!(err.message, "index out of range [5] with length 3");
    assert!(err.span.is_some());

    let err = run_err("func main() {\n\tvar m map[string]int\n\tm[\"a\"] = 1\n}");
    assert_eq!(err.message, "assignment to entry in nil map");

    let err = run_err("func main() {\n\tvar x any = 1\n\ts := x.(string)\n\tprintln(s)\n}");
    assert_eq!(err.message, "interface conversion: interface {} is int, not string");
}

#[test]
fn test_pointer_writes() {
    let out = output(
        "func main() {
	x := 1
	p := &x
	*p = 5
	list := []int{1, 2, 3}
	q := &list[1]
	*q = 20
	m := map[string]int{\"a\": 1}
	r := &m[\"a\"]
	*r += 10
	println(x, list, m)
}",
    );
    assert_eq!(out, "5 [1 20 3] map[a:11]\n");
}

#[test]
fn test_field_of_missing_map_entry_reads_zero() {
    let out = output(
        "type P struct {
	X int
	Tag string
}
func main() {
	var m map[string]P
	println(m[\"a\"].X, len(m), m == nil, m)
	n := map[string]P{\"b\": P{X: 2}}
	println(n[\"a\"].X, n[\"b\"].X, len(n), n != nil)
}",
    );
    assert_eq!(out, "0 0 true map[]\n0 2 1 true\n");
}

#[test]
fn test_struct_methods() {
    let out = output(
        "type Point struct {
	X, Y int
}
func (p Point) Sum() int {
	return p.X + p.Y
}
func (p *Point) Move(dx int) {
	p.X += dx
}
func main() {
	p := Point{1, 2}
	p.Move(10)
	q := &Point{X: 3}
	q.Move(1)
	sum := p.Sum
	println(sum(), q.Sum(), p, q)
}",
    );
    assert_eq!(out, "13 4 {11 2} &{4 0}\n");
}

#[test]
fn test_range_forms() {
    let out = output(
        "func main() {
	m := map[string]int{\"b\": 2, \"a\": 1, \"c\": 3}
	keys := \"\"
	total := 0
	for k, v := range m {
		keys += k
		total += v
	}
	for i := range 3 {
		total += i
	}
	println(keys, total)
	for i, r := range \"hé\" {
		println(i, r)
	}
}",
    );
    assert_eq!(out, "abc 9\n0 104\n1 233\n");
}

#[test]
fn test_range_closures_and_pointers_share_each_iteration() {
    let out = output(
        "func main() {
	var fs []func() int
	var ps []*int
	for _, v := range []int{1, 2, 3} {
		fs = append(fs, func() int { return v })
		ps = append(ps, &v)
	}
	*ps[0] = 10
	for i := range fs {
		println(fs[i](), *ps[i])
	}
}",
    );
    assert_eq!(out, "10 10\n2 2\n3 3\n");
}

#[test]
fn test_variadic_and_spread() {
    let out = output(
        "func sum(xs ...int) int {
	t := 0
	for _, x := range xs {
		t += x
	}
	return t
}
func main() {
	nums := []int{1, 2, 3}
	println(sum(), sum(1, 2), sum(nums...))
}",
    );
    assert_eq!(out, "0 3 6\n");
}

#[test]
fn test_switch_iota_and_labels() {
    let out = output(
        "const (
	A = iota
	B
	C
)
func classify(n int) string {
	switch {
	case n < 0:
		return \"neg\"
	case n == 0:
		return \"zero\"
	default:
		return \"pos\"
	}
}
func main() {
	println(A, B, C, classify(-1), classify(0), classify(5))
	count := 0
outer:
	for i := 0; i < 3; i++ {
		for j := 0; j < 3; j++ {
			if j == 2 {
				continue outer
			}
			if i == 2 {
				break outer
			}
			count++
		}
	}
	println(count)
}",
    );
    assert_eq!(out, "0 1 2 neg zero pos\n4\n");
}

#[test]
fn test_multi_return_count_mismatch() {
    let err = run_err(
        "func pair() (int, int) {
	return 1, 2
}
func main() {
	a, b, c := pair()
	println(a, b, c)
}",
    );
    assert_eq!(err.message, "assignment mismatch: 3 variable(s) but 2 value(s)");
}

#[test]
fn test_recursion_limit_is_not_recoverable() {
    let config = config().with_max_call_depth(50);
    let mut vm = load(
        "func f(n int) int {
	return f(n + 1)
}
func main() {
	defer func() {
		recover()
	}()
	f(0)
}",
        Mode::Program,
        &config,
    );
    let err = match vm.run() {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    };
    assert_eq!(err.message, "maximum recursion depth exceeded (limit: 50)");
    assert!(vm.is_halted());
}

#[test]
fn test_snippet_returns_last_expression() {
    let config = config();
    let mut vm = load("x := 2\nx * 21", Mode::Snippet, &config);
    assert!(matches!(vm.run(), Ok(Value::Int(42))));
}

#[test]
fn test_step_reports_finish_repeatedly() {
    let config = config();
    let mut vm = load("1 + 1", Mode::Snippet, &config);
    let mut steps = 0;
    let value = loop {
        steps += 1;
        match vm.step() {
            Outcome::Continue => {}
            Outcome::Finished(value) => break value,
            other => panic!("unexpected {other:?}"),
        }
    };
    assert!(steps > 1);
    assert!(matches!(value, Value::Int(2)));
    assert!(matches!(vm.step(), Outcome::Finished(Value::Int(2))));

    vm.reset();
    assert!(!vm.is_halted());
    assert!(matches!(vm.run(), Ok(Value::Int(2))));
}

#[test]
fn test_run_with_stop_halts_in_place() {
    let config = config();
    let mut vm = load(
        "func main() {\n\tdefer println(\"deferred\")\n\tpanic(\"stop here\")\n}",
        Mode::Program,
        &config,
    );
    let mut seen = Vec::new();
    let completion = vm.run_with(|outcome| {
        if let Outcome::Panicking(value) = outcome {
            seen.push(value.to_string());
        }
        Decision::Stop
    });
    assert!(matches!(completion, Ok(Completion::Stopped)));
    assert_eq!(seen, ["stop here"]);
    assert_eq!(config.print.get_output(), "");

    let err = match vm.run() {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    };
    assert_eq!(err.message, "panic: stop here");
    assert_eq!(config.print.get_output(), "deferred\n");
}

#[test]
fn test_run_with_continue_reaches_recovery() {
    let config = config();
    let mut vm = load(
        "func main() {
	defer func() {
		println(\"got\", recover())
	}()
	panic(\"oops\")
}",
        Mode::Program,
        &config,
    );
    let mut panics = 0;
    let completion = vm.run_with(|outcome| {
        if matches!(outcome, Outcome::Panicking(_)) {
            panics += 1;
        }
        Decision::Continue
    });
    assert!(matches!(completion, Ok(Completion::Finished(_))));
    assert_eq!(panics, 1);
    assert_eq!(config.print.get_output(), "got oops\n");
}

#[test]
fn test_call_value_runs_closure_in_its_env() {
    let config = config();
    let mut vm = load(
        "total := 0\nfunc add(n int) int {\n\ttotal += n\n\treturn total\n}",
        Mode::Program,
        &config,
    );
    assert!(vm.run().is_ok());
    let Some(add) = vm.env().get(config.interner.intern("add")) else {
        panic!("add is not defined");
    };
    let first = Vm::call_value(&config, add.clone(), vec![Value::Int(3)]);
    assert!(matches!(first, Ok(Value::Int(3))));
    let second = Vm::call_value(&config, add.clone(), vec![Value::Int(4)]);
    assert!(matches!(second, Ok(Value::Int(7))));

    let err = match Vm::call_value(&config, add, vec![]) {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    };
    assert_eq!(err.message, "wrong argument count in call to add: have 0, want 1");

    let len = Vm::call_value(&config, Value::Builtin(Builtin::Len), vec![Value::from("abc")]);
    assert!(matches!(len, Ok(Value::Int(3))));
}

/// Source that builds `entries` as a map and prints the range sum, the
/// lookup sum over the known keys, and the length.
fn map_sum_program(entries: &BTreeMap<String, i64>) -> String {
    let mut literal = String::new();
    let mut keys = String::new();
    for (k, v) in entries {
        let _ = write!(literal, "{k:?}: {v}, ");
        let _ = write!(keys, "{k:?}, ");
    }
    format!(
        "func main() {{
	m := map[string]int{{{literal}}}
	keys := []string{{{keys}}}
	ranged := 0
	for _, v := range m {{
		ranged += v
	}}
	looked := 0
	for _, k := range keys {{
		looked += m[k]
	}}
	println(ranged, looked, len(m))
}}"
    )
}

proptest! {
    #[test]
    fn test_map_range_agrees_with_lookups(
        entries in proptest::collection::btree_map("[a-z]{1,6}", -1000i64..1000, 0..24)
    ) {
        let sum: i64 = entries.values().sum();
        let out = output(&map_sum_program(&entries));
        prop_assert_eq!(out, format!("{sum} {sum} {}\n", entries.len()));
    }
}
