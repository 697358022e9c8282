use std::rc::Rc;

use golite_ir::{BinaryOp, StringInterner};
use pretty_assertions::assert_eq;

use super::*;
use crate::{CompileErrorKind, Constant, Op, Unsupported};

fn compile_src(source: &str, mode: Mode) -> (Result<Rc<Function>, CompileError>, StringInterner) {
    let interner = StringInterner::new();
    let file = match golite_parse::parse_source(source, &interner) {
        Ok(file) => file,
        Err(e) => panic!("parse failed: {e}"),
    };
    let result = Compiler::new(&interner).compile_file(&file, mode);
    (result, interner)
}

fn compile_ok(source: &str, mode: Mode) -> (Rc<Function>, StringInterner) {
    match compile_src(source, mode) {
        (Ok(func), interner) => (func, interner),
        (Err(e), _) => panic!("compile failed: {e}"),
    }
}

fn compile_err(source: &str) -> String {
    match compile_src(source, Mode::Program).0 {
        Ok(_) => panic!("expected compile error for {source:?}"),
        Err(e) => e.to_string(),
    }
}

fn position(code: &[Op], pred: impl Fn(&Op) -> bool) -> usize {
    match code.iter().position(pred) {
        Some(at) => at,
        None => panic!("instruction not found in {code:?}"),
    }
}

#[test]
fn test_else_jump_lands_on_else_branch() {
    let (func, _) = compile_ok(
        "x := true\na := 0\nif x { a = 1 } else { a = 2 }\na = 3",
        Mode::Program,
    );
    let code = &func.code;
    let cond = position(code, |op| matches!(op, Op::JumpIfFalse(_)));
    let target = code[cond].jump_target().unwrap_or_default() as usize;

    // The then-branch ends with a jump over the else branch.
    assert!(matches!(code[target - 1], Op::Jump(_)));
    // The else branch starts with its block scope, then stores 2.
    assert_eq!(code[target], Op::PushScope);
    let Op::Const(index) = code[target + 1] else {
        panic!("expected constant after else scope, got {:?}", code[target + 1]);
    };
    assert_eq!(func.constants[index as usize], Constant::Int(2));

    // The then-branch jump lands after the else branch.
    let end = code[target - 1].jump_target().unwrap_or_default() as usize;
    assert_eq!(code[end - 1], Op::PopScope);
}

#[test]
fn test_if_without_else_jumps_past_then_branch() {
    let (func, _) = compile_ok("x := false\nif x { x = true }\nx = false", Mode::Program);
    let code = &func.code;
    let cond = position(code, |op| matches!(op, Op::JumpIfFalse(_)));
    let target = code[cond].jump_target().unwrap_or_default() as usize;
    assert_eq!(code[target - 1], Op::PopScope);
    assert!(matches!(code[target], Op::False));
}

#[test]
fn test_short_circuit_operators() {
    let (func, _) = compile_ok("a := true && false\nb := false || true", Mode::Program);
    let and = position(&func.code, |op| matches!(op, Op::JumpIfFalseOrPop(_)));
    let or = position(&func.code, |op| matches!(op, Op::JumpIfTrueOrPop(_)));
    assert_eq!(func.code[and].jump_target(), Some(u32::try_from(and + 2).unwrap_or(0)));
    assert_eq!(func.code[or].jump_target(), Some(u32::try_from(or + 2).unwrap_or(0)));
    assert!(!func.code.contains(&Op::Binary(BinaryOp::And)));
}

#[test]
fn test_program_calls_main_after_declarations() {
    let (func, interner) = compile_ok(
        "var total = helper()\nfunc main() { println(total) }\nfunc helper() int { return 1 }",
        Mode::Program,
    );
    let main = interner.intern("main");
    let helper = interner.intern("helper");
    let code = &func.code;
    let define_helper = position(code, |op| *op == Op::Define(helper));
    let call_helper = position(code, |op| *op == Op::Load(helper));
    assert!(define_helper < call_helper, "functions are bound before var initializers");

    let tail: Vec<Op> = code[code.len() - 4..].to_vec();
    assert_eq!(
        tail,
        vec![
            Op::Load(main),
            Op::Call {
                argc: 0,
                spread: false
            },
            Op::Pop,
            Op::Return(0),
        ]
    );
}

#[test]
fn test_snippet_returns_final_expression() {
    let (func, _) = compile_ok("x := 2\nx * 21", Mode::Snippet);
    assert_eq!(func.code.last(), Some(&Op::Return(1)));
    let (func, _) = compile_ok("x := 2", Mode::Snippet);
    assert_eq!(func.code.last(), Some(&Op::Return(0)));
}

#[test]
fn test_rejected_constructs_name_the_construct() {
    let cases = [
        ("func main() { go f() }", "goroutines are not supported"),
        ("func main() { select {} }", "select statements are not supported"),
        ("func main() { ch <- 1 }", "channel send is not supported"),
        ("func main() { x := <-ch }", "channel receive is not supported"),
        (
            "func main() { switch v := x.(type) { case int: } }",
            "type switches are not supported",
        ),
        (
            "func main() { switch { case true: fallthrough } }",
            "fallthrough is not supported",
        ),
        ("func main() { goto end }", "goto is not supported"),
    ];
    for (source, message) in cases {
        assert_eq!(compile_err(source), message, "{source}");
    }
}

#[test]
fn test_count_mismatch() {
    assert_eq!(
        compile_err("a, b := 1, 2, 3"),
        "assignment count mismatch: 2 variable(s) but 3 value(s)"
    );
    assert_eq!(
        compile_err("var a, b, c = 1, 2"),
        "assignment count mismatch: 3 variable(s) but 2 value(s)"
    );
    // A single multi-value call may feed several names.
    let (func, _) = compile_ok(
        "func pair() (int, int) { return 1, 2 }\na, b := pair()",
        Mode::Program,
    );
    assert!(func.code.contains(&Op::Unpack(2)));
}

#[test]
fn test_define_errors() {
    assert_eq!(compile_err("a := 1\na := 2"), "no new variables on left side of :=");
    assert_eq!(compile_err("a := 1\na, _ := 2, 3"), "no new variables on left side of :=");
    assert_eq!(compile_err("m := 1\nm.x := 2"), "non-name m.x on left side of :=");
    // Redeclaring in an inner block shadows.
    let (func, interner) = compile_ok("a := 1\n{ a := 2 }", Mode::Program);
    let a = interner.intern("a");
    let defines = func.code.iter().filter(|op| **op == Op::Define(a)).count();
    assert_eq!(defines, 2);
}

#[test]
fn test_break_and_continue_placement() {
    assert_eq!(
        compile_err("func main() { break }"),
        "break is not in a loop, switch, or select"
    );
    assert_eq!(
        compile_err("func main() { switch { default: continue } }"),
        "continue is not in a loop"
    );
    assert_eq!(
        compile_err("func main() { for { break outer } }"),
        "invalid break label outer"
    );
    assert_eq!(
        compile_err("func main() { L: switch { default: for { continue L } } }"),
        "invalid continue label L"
    );
}

#[test]
fn test_break_out_of_range_discards_iterators() {
    let (func, _) = compile_ok(
        "outer: for _, row := range rows {\n\tfor _, x := range row {\n\t\tif x < 0 { break outer }\n\t}\n}",
        Mode::Program,
    );
    let iter_ends = func.code.iter().filter(|op| **op == Op::IterEnd).count();
    // One per loop exit, plus one for the labelled break out of the inner range.
    assert_eq!(iter_ends, 3);
}

#[test]
fn test_range_opens_a_scope_per_iteration() {
    let (func, _) = compile_ok("for _, v := range xs {\n\tif v > 1 { continue }\n}", Mode::Program);
    let code = &func.code;
    let next = position(code, |op| matches!(op, Op::IterNext { .. }));
    assert_eq!(code[next + 1], Op::PushScope);

    // The continue and the loop back-edge both leave the iteration scope.
    let back_edges: Vec<usize> = code
        .iter()
        .enumerate()
        .filter(|(_, op)| **op == Op::Jump(operand(next)))
        .map(|(at, _)| at)
        .collect();
    assert_eq!(back_edges.len(), 2);
    for at in back_edges {
        assert_eq!(code[at - 1], Op::PopScope, "{code:?}");
    }
}

#[test]
fn test_return_count_checked() {
    assert_eq!(
        compile_err("func f() (int, error) { return 1 }"),
        "wrong number of return values (have 1, want 2)"
    );
    // Forwarding a multi-value call and bare return with named results are fine.
    compile_ok(
        "func g() (int, error) { return 1, nil }\nfunc f() (int, error) { return g() }\nfunc h() (n int) { n = 2; return }",
        Mode::Program,
    );
}

#[test]
fn test_iota_constants() {
    let (func, interner) = compile_ok(
        "const (\n\tA = iota * 10\n\tB\n\tC\n)",
        Mode::Program,
    );
    let ints: Vec<i64> = func
        .constants
        .iter()
        .filter_map(|c| match c {
            Constant::Int(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(ints, vec![0, 10, 1, 2]);
    assert!(func.code.contains(&Op::Define(interner.intern("C"))));
}

#[test]
fn test_places_and_addresses() {
    let (func, _) = compile_ok(
        "xs[i] += 1\np.x = 2\n*q = 3\nr := &xs[0]\ns := &T{}",
        Mode::Program,
    );
    let code = &func.code;
    assert!(code.contains(&Op::IndexAddr));
    assert!(code.contains(&Op::StorePtr));
    assert!(code.contains(&Op::Escape));
    assert!(code.iter().any(|op| matches!(op, Op::FieldAddr(_))));

    assert_eq!(compile_err("f() = 1"), "cannot assign to f(...)");
    assert_eq!(compile_err("p := &f()"), "cannot take the address of f(...)");
    assert_eq!(
        compile_err("func main() { defer x }"),
        "expression in defer must be function call"
    );
}

#[test]
fn test_disassemble_lists_nested_functions() {
    let (func, interner) = compile_ok(
        "func add(a, b int) int { return a + b }",
        Mode::Program,
    );
    let text = func.disassemble(&interner);
    assert!(text.contains("func <entry>:"));
    assert!(text.contains("func add:"));
    assert!(text.contains("Load a"));
}
