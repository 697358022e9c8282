use pretty_assertions::assert_eq;

use golite::{Completion, Decision, Error, EvalErrorKind, InterpreterBuilder, Outcome, ScriptFn};

use crate::common::{build, build_with, failure};

const ACCOUNT: &str = "balance := 0

func deposit(n int) int {
	balance += n
	return balance
}

func split(n int) (int, int) {
	return n / 2, n % 2
}";

#[test]
fn test_snippets_see_and_extend_the_program() {
    let (mut interp, _) = build(ACCOUNT);
    interp.run().unwrap();

    assert_eq!(interp.exec("deposit(40)").unwrap().to_string(), "40");
    interp.exec("bonus := 2").unwrap();
    assert_eq!(interp.get::<i64>("balance + bonus").unwrap(), 42);
    assert!(matches!(interp.exec("bonus = 3"), Ok(golite::Value::Nil)));
    assert_eq!(interp.get::<i64>("bonus").unwrap(), 3);

    let err = interp.get::<String>("balance").unwrap_err();
    assert_eq!(err.to_string(), "cannot convert int to String");
}

#[test]
fn test_host_calls_into_script_functions() {
    let (mut interp, _) = build(ACCOUNT);
    interp.run().unwrap();

    assert_eq!(interp.call::<i64>("deposit", (5_i64,)).unwrap(), 5);
    assert_eq!(interp.call::<(i64, i64)>("split", (7_i64,)).unwrap(), (3, 1));

    let deposit: ScriptFn = interp.get("deposit").unwrap();
    assert_eq!(deposit.call::<i64>((10_i64,)).unwrap(), 15);
    assert_eq!(interp.get::<i64>("balance").unwrap(), 15);

    let err = interp.call::<i64>("withdraw", ()).unwrap_err();
    assert_eq!(err.to_string(), "undefined: withdraw");
    let err = interp.call::<i64>("deposit", ()).unwrap_err();
    assert_eq!(err.to_string(), "wrong argument count in call to deposit: have 0, want 1");
    let not_callable = interp.get::<ScriptFn>("balance");
    assert!(matches!(not_callable, Err(Error::Eval(_))));
}

#[test]
fn test_stopped_runs_resume() {
    let (mut interp, out) = build(
        r#"func main() {
	defer println("deferred")
	println("before")
	panic("halt")
}"#,
    );
    let mut panics = 0;
    let completion = interp
        .run_with(|outcome| {
            if matches!(outcome, Outcome::Panicking(_)) {
                panics += 1;
            }
            Decision::Stop
        })
        .unwrap();
    assert!(matches!(completion, Completion::Stopped));
    assert_eq!(panics, 1);
    assert_eq!(out.get_output(), "before\n");

    let err = interp.run().unwrap_err();
    assert_eq!(err.to_string(), "panic: halt");
    assert_eq!(out.get_output(), "before\ndeferred\n");
}

#[test]
fn test_reset_runs_again() {
    let (mut interp, out) = build("func main() {\n\tprintln(\"hi\")\n}");
    interp.run().unwrap();
    interp.run().unwrap();
    assert_eq!(out.get_output(), "hi\n");

    interp.reset();
    interp.run().unwrap();
    assert_eq!(out.get_output(), "hi\nhi\n");
}

#[test]
fn test_stepping_to_the_end() {
    let (mut interp, out) = build("x := 20\nprintln(x + 1)");
    let mut steps = 0;
    loop {
        steps += 1;
        match interp.step() {
            Outcome::Continue => {}
            Outcome::Finished(_) => break,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert!(steps > 2);
    assert_eq!(out.get_output(), "21\n");
}

#[test]
fn test_call_depth_is_configurable() {
    let source = "func down(n int) int {\n\treturn down(n + 1)\n}\n\nfunc main() {\n\tdown(0)\n}";
    let err = failure(InterpreterBuilder::new().source(source).max_call_depth(64));
    let eval = err.as_eval().expect("eval error");
    assert_eq!(eval.kind, EvalErrorKind::RecursionLimit { limit: 64 });
    assert_eq!(err.to_string(), "maximum recursion depth exceeded (limit: 64)");

    let (mut interp, _) = build_with(
        InterpreterBuilder::new()
            .source(
                "func down(n int) int {\n\tif n == 0 {\n\t\treturn 0\n\t}\n\treturn down(n - 1)\n}",
            )
            .max_call_depth(64),
    );
    interp.run().unwrap();
    assert_eq!(interp.call::<i64>("down", (50_i64,)).unwrap(), 0);
}
