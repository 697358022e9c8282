use pretty_assertions::assert_eq;

use golite::{Error, EvalErrorKind};

use crate::common::{output, source_failure};

#[test]
fn test_word_frequencies() {
    let out = output(
        r#"func main() {
	counts := map[string]int{}
	for _, w := range []string{"b", "a", "b", "c", "b", "a"} {
		counts[w]++
	}
	for k, v := range counts {
		println(k, v)
	}
	println(len(counts), counts)
}"#,
    );
    assert_eq!(out, "a 2\nb 3\nc 1\n3 map[a:2 b:3 c:1]\n");
}

#[test]
fn test_closures_and_slices() {
    let out = output(
        "func counter() func() int {
	n := 0
	return func() int {
		n++
		return n
	}
}

func main() {
	next := counter()
	var seen []int
	for i := 0; i < 3; i++ {
		seen = append(seen, next()*10)
	}
	tail := seen[1:]
	tail[0] = 0
	println(seen, tail, len(tail))
}",
    );
    assert_eq!(out, "[10 20 30] [0 30] 2\n");
}

#[test]
fn test_structs_and_methods() {
    let out = output(
        r#"type Shape interface {
	Area() int
}

type Rect struct {
	W, H int
}

func (r Rect) Area() int { return r.W * r.H }

func (r *Rect) Grow(n int) {
	r.W += n
	r.H += n
}

func main() {
	r := &Rect{W: 2, H: 3}
	r.Grow(1)
	var s Shape = r
	println(s.Area(), *r)
}"#,
    );
    assert_eq!(out, "12 {3 4}\n");
}

#[test]
fn test_top_level_statements_run_without_main() {
    assert_eq!(output("x := 6\nprintln(x * 7)"), "42\n");
}

#[test]
fn test_recovered_panic_keeps_running() {
    let out = output(
        r#"func safeDiv(a, b int) (q int, err string) {
	defer func() {
		if r := recover(); r != nil {
			err = r.(string)
		}
	}()
	return a / b, "ok"
}

func main() {
	q, err := safeDiv(7, 2)
	println(q, err)
	q, err = safeDiv(1, 0)
	println(q, err)
}"#,
    );
    assert_eq!(out, "3 ok\n0 integer divide by zero\n");
}

#[test]
fn test_unrecovered_panic_is_an_eval_error() {
    let err = source_failure("func main() {\n\tpanic(\"out of cheese\")\n}");
    assert_eq!(err.to_string(), "panic: out of cheese");
    let eval = err.as_eval().expect("eval error");
    assert!(matches!(eval.kind, EvalErrorKind::Panic { .. }));
    assert!(eval.backtrace.is_some());
}

#[test]
fn test_runtime_errors_carry_their_message() {
    let source = "func main() {\n\tvar p *int\n\tprintln(*p)\n}";
    let err = source_failure(source);
    assert!(matches!(&err, Error::Eval(e) if e.kind == EvalErrorKind::NilDereference));
    assert_eq!(err.line_col(source).map(|(line, _)| line), Some(3));

    let err = source_failure("func main() {\n\tprintln(undefinedThing)\n}");
    assert_eq!(err.to_string(), "undefined: undefinedThing");
}

#[test]
fn test_rejected_constructs_fail_to_build() {
    let err = source_failure("func main() { go work() }");
    assert!(matches!(err, Error::Compile(_)));
    assert_eq!(err.to_string(), "compile error: goroutines are not supported");

    let source = "func main() {\n\tx := (1 +\n}";
    let err = source_failure(source);
    assert!(matches!(err, Error::Parse(_)), "{err}");
    assert!(err.to_string().starts_with("parse error: "));
    assert!(matches!(err.line_col(source), Some((2 | 3, _))));
}
